use super::classifier::{Classification, classify, line_count};
use super::combiner::{CombinedMatcher, MatcherEntry};
use super::error::AnalysisError;
use crate::decoration::DecorationHost;
use crate::filter::Filter;
use crate::focus::{self, FocusView};
use crate::project::Project;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A pass whose filter set keeps changing underneath it is retried this many
/// times before giving up.
const MAX_PUBLISH_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Suppress focus views while the project's filtering switch is off
    pub focus_respects_filtering_enabled: bool,
}

/// Which filters a request needs results for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Purpose {
    Highlight,
    Focus,
}

impl Purpose {
    fn eligible(self, filter: &Filter) -> bool {
        match self {
            Purpose::Highlight => filter.highlight_enabled(),
            Purpose::Focus => filter.disposition() != crate::filter::Disposition::None,
        }
    }
}

/// Shared entry point for highlighting and focus views.
///
/// Requests for the same document are serialized: while one pass for a
/// document is running, a second request for it waits and then reuses the
/// published result. Classification runs without holding the project lock and
/// its results are published in one write.
#[derive(Debug)]
pub struct AnalysisService {
    project: Arc<RwLock<Project>>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    scans: AtomicUsize,
    options: EngineOptions,
}

impl AnalysisService {
    pub fn new(project: Project, options: EngineOptions) -> Self {
        Self::with_shared(Arc::new(RwLock::new(project)), options)
    }

    pub fn with_shared(project: Arc<RwLock<Project>>, options: EngineOptions) -> Self {
        Self {
            project,
            in_flight: Mutex::new(HashMap::new()),
            scans: AtomicUsize::new(0),
            options,
        }
    }

    pub fn project(&self) -> Arc<RwLock<Project>> {
        Arc::clone(&self.project)
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, Project>, AnalysisError> {
        self.project.read().map_err(|_| AnalysisError::Poisoned)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Project>, AnalysisError> {
        self.project.write().map_err(|_| AnalysisError::Poisoned)
    }

    /// Number of document scans performed so far
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    /// Classification of `document` for every highlight-enabled filter.
    pub fn highlight(&self, document: &str, text: &str) -> Result<Classification, AnalysisError> {
        if !self.read()?.filtering_enabled() {
            return Err(AnalysisError::FilteringDisabled);
        }
        self.analyze(document, text, Purpose::Highlight)
    }

    /// Focus view of `document` built from every filter with a disposition.
    pub fn focus(&self, document: &str, text: &str) -> Result<FocusView, AnalysisError> {
        if self.options.focus_respects_filtering_enabled && !self.read()?.filtering_enabled() {
            return Err(AnalysisError::FilteringDisabled);
        }

        // focus views always derive from the original document
        let document = focus::original_identity(document).unwrap_or(document);

        for _ in 0..MAX_PUBLISH_ATTEMPTS {
            self.analyze(document, text, Purpose::Focus)?;
            let project = self.read()?;
            if let Some(view) = focus::generate(document, text, project.focus_filters()) {
                return Ok(view);
            }
        }
        Err(AnalysisError::Contended {
            document: document.to_string(),
        })
    }

    /// Forget results for a document whose text changed
    pub fn invalidate(&self, document: &str) -> Result<(), AnalysisError> {
        self.write()?.clear_document(document);
        Ok(())
    }

    /// Make `next` the active project
    pub fn switch_project(
        &self,
        next: Project,
        host: &mut dyn DecorationHost,
    ) -> Result<Project, AnalysisError> {
        let mut project = self.write()?;
        let previous = project.switch_to(next, host);
        tracing::info!(from = previous.name(), to = project.name(), "switched project");
        Ok(previous)
    }

    fn analyze(
        &self,
        document: &str,
        text: &str,
        purpose: Purpose,
    ) -> Result<Classification, AnalysisError> {
        let gate = self.gate(document)?;
        let result = {
            let _guard = gate.lock().map_err(|_| AnalysisError::Poisoned)?;
            self.analyze_serialized(document, text, purpose)
        };
        self.release_gate(document, gate);
        result
    }

    fn analyze_serialized(
        &self,
        document: &str,
        text: &str,
        purpose: Purpose,
    ) -> Result<Classification, AnalysisError> {
        let lines = line_count(text);

        for attempt in 0..MAX_PUBLISH_ATTEMPTS {
            let (revision, pending) = {
                let project = self.read()?;
                let eligible = project.filters().iter().filter(|f| purpose.eligible(f));
                if let Some(cached) = project.cached_classification(document, lines, eligible) {
                    tracing::debug!(document, ?purpose, "using cached classification");
                    return Ok(cached);
                }

                let pending: Vec<MatcherEntry> = project
                    .filters()
                    .iter()
                    .filter(|f| purpose.eligible(f) && !f.cache().is_analyzed(document))
                    .map(MatcherEntry::from_filter)
                    .collect();
                (project.revision(), pending)
            };

            let matcher = CombinedMatcher::build(&pending)?;
            let pass = classify(text, &matcher);
            self.scans.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                document,
                ?purpose,
                filters = pending.len(),
                lines,
                "classified document"
            );

            if self.write()?.publish(document, revision, pass) {
                continue;
            }
            tracing::debug!(document, attempt, "filter set changed during classification, retrying");
        }

        // last look: a concurrent writer may have left everything analyzed
        let project = self.read()?;
        let eligible = project.filters().iter().filter(|f| purpose.eligible(f));
        project
            .cached_classification(document, lines, eligible)
            .ok_or_else(|| AnalysisError::Contended {
                document: document.to_string(),
            })
    }

    fn gate(&self, document: &str) -> Result<Arc<Mutex<()>>, AnalysisError> {
        let mut in_flight = self.in_flight.lock().map_err(|_| AnalysisError::Poisoned)?;
        Ok(Arc::clone(
            in_flight
                .entry(document.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }

    fn release_gate(&self, document: &str, gate: Arc<Mutex<()>>) {
        let Ok(mut in_flight) = self.in_flight.lock() else {
            return;
        };
        // the map and this caller are the only holders: nobody is waiting
        if Arc::strong_count(&gate) == 2 {
            in_flight.remove(document);
        }
    }
}

/// Identity used for documents read from disk
pub fn document_identity(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

/// Read a document from disk. Bytes that are not valid UTF-8 are replaced
/// rather than failing the whole document.
pub fn read_document(path: &Path) -> Result<String, AnalysisError> {
    let bytes = std::fs::read(path).map_err(|source| {
        tracing::warn!(path = %path.display(), error = %source, "failed to read document");
        AnalysisError::Document {
            path: path.to_path_buf(),
            source,
        }
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                valid_up_to = e.utf8_error().valid_up_to(),
                "document is not valid UTF-8, replacing invalid bytes"
            );
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoration::DecorationRegistry;
    use crate::filter::{Disposition, FilterSpec};
    use crate::project::FilterEdit;

    fn service(specs: Vec<FilterSpec>) -> AnalysisService {
        let mut host = DecorationRegistry::new();
        let mut project = Project::new("test");
        for spec in specs {
            project.add_filter(spec, &mut host).unwrap();
        }
        AnalysisService::new(project, EngineOptions::default())
    }

    #[test]
    fn test_repeated_highlight_scans_once() {
        let service = service(vec![FilterSpec::text("error")]);
        let first = service.highlight("doc", "ok\nerror").unwrap();
        let second = service.highlight("doc", "ok\nerror").unwrap();
        assert_eq!(first, second);
        assert_eq!(service.scan_count(), 1);
    }

    #[test]
    fn test_highlight_and_focus_share_results() {
        let service = service(vec![FilterSpec::text("error")]);
        service.highlight("doc", "ok\nerror").unwrap();
        let view = service.focus("doc", "ok\nerror").unwrap();
        assert_eq!(view.lines, vec![1]);
        assert_eq!(service.scan_count(), 1);
    }

    #[test]
    fn test_only_unanalyzed_filters_are_rescanned() {
        let service = service(vec![FilterSpec::text("a")]);
        service.highlight("doc", "a\nb").unwrap();

        let mut host = DecorationRegistry::new();
        let b = service
            .write()
            .unwrap()
            .add_filter(FilterSpec::text("b"), &mut host)
            .unwrap();
        let result = service.highlight("doc", "a\nb").unwrap();
        assert_eq!(result.winner(1), Some(b));
        assert_eq!(service.scan_count(), 2);
    }

    #[test]
    fn test_invalidate_forces_rescan() {
        let service = service(vec![FilterSpec::text("x")]);
        service.highlight("doc", "x").unwrap();
        service.invalidate("doc").unwrap();
        let result = service.highlight("doc", "y\nx").unwrap();
        assert!(result.winner(1).is_some());
        assert_eq!(service.scan_count(), 2);
    }

    #[test]
    fn test_filtering_switch_disables_highlight_only_by_default() {
        let service = service(vec![FilterSpec::text("x")]);
        service.write().unwrap().set_filtering_enabled(false);
        assert!(matches!(
            service.highlight("doc", "x"),
            Err(AnalysisError::FilteringDisabled)
        ));
        assert!(service.focus("doc", "x").is_ok());
    }

    #[test]
    fn test_filtering_switch_can_govern_focus() {
        let mut project = Project::new("p");
        project.set_filtering_enabled(false);
        let service = AnalysisService::new(
            project,
            EngineOptions {
                focus_respects_filtering_enabled: true,
            },
        );
        assert!(matches!(
            service.focus("doc", "x"),
            Err(AnalysisError::FilteringDisabled)
        ));
    }

    #[test]
    fn test_focus_identity_maps_to_original_cache() {
        let service = service(vec![
            FilterSpec::text("keep"),
            FilterSpec::text("drop").with_disposition(Disposition::Excluded),
        ]);
        let text = "keep\nkeep drop\nother";
        service.focus("file:///a.log", text).unwrap();
        let view = service
            .focus(&focus::focus_identity("file:///a.log", 3), text)
            .unwrap();
        assert_eq!(view.source, "file:///a.log");
        assert_eq!(view.rows, vec!["keep"]);
        assert_eq!(service.scan_count(), 1);
    }

    #[test]
    fn test_edit_invalidates_and_rescans() {
        let service = service(vec![FilterSpec::text("x")]);
        service.highlight("doc", "x\ny").unwrap();
        let id = service.read().unwrap().filters()[0].id();
        let mut host = DecorationRegistry::new();
        service
            .write()
            .unwrap()
            .update_filter(
                id,
                FilterEdit::pattern("y", crate::filter::PatternMode::Text),
                &mut host,
            )
            .unwrap();
        let result = service.highlight("doc", "x\ny").unwrap();
        assert_eq!(result.winner(1), Some(id));
        assert_eq!(result.winner(0), None);
        assert_eq!(service.scan_count(), 2);
    }

    #[test]
    fn test_missing_document_is_recoverable() {
        let err = read_document(Path::new("/definitely/not/here.log")).unwrap_err();
        assert!(matches!(err, AnalysisError::Document { .. }));
    }

    #[test]
    fn test_invalid_utf8_bytes_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.log");
        std::fs::write(&path, b"error one\n\xff binary\nok\n").unwrap();

        let text = read_document(&path).unwrap();
        assert_eq!(text, "error one\n\u{fffd} binary\nok\n");

        let service = service(vec![FilterSpec::text("binary")]);
        let result = service.highlight(&document_identity(&path), &text).unwrap();
        let id = service.read().unwrap().filters()[0].id();
        assert_eq!(result.winner(1), Some(id));
    }

    #[test]
    fn test_concurrent_requests_scan_once() {
        let service = Arc::new(service(vec![
            FilterSpec::regex(r"err\w*"),
            FilterSpec::text("warn"),
        ]));
        let text: String = (0..2000)
            .map(|i| if i % 3 == 0 { "error here\n" } else { "warn there\n" })
            .collect();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                let text = text.clone();
                std::thread::spawn(move || service.highlight("shared", &text).unwrap())
            })
            .collect();
        let results: Vec<Classification> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(service.scan_count(), 1);
    }
}
