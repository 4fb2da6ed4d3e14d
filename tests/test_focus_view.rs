use log_focus::decoration::DecorationRegistry;
use log_focus::engine::{AnalysisService, EngineOptions};
use log_focus::filter::{Disposition, Filter, FilterSpec, ResultCache};
use log_focus::focus::{self, visible_lines};
use log_focus::project::{FilterEdit, Project};
use proptest::prelude::*;
use std::collections::BTreeSet;

const DOC: &str = "file:///var/log/app.log";

fn cached_filter(spec: FilterSpec, lines: &[usize]) -> Filter {
    let mut filter = Filter::from_spec(&spec).expect("valid filter");
    filter
        .cache_mut()
        .update(DOC, lines.iter().copied().collect());
    filter
}

#[test]
fn test_exclusion_removes_included_line() {
    let error = cached_filter(FilterSpec::regex("error"), &[1, 3]);
    let debug = cached_filter(
        FilterSpec::regex("debug").with_disposition(Disposition::Excluded),
        &[3],
    );
    let text = "l0\nl1 error\nl2\nl3 error debug\nl4";

    let view = focus::generate(DOC, text, [&error, &debug]).unwrap();
    assert_eq!(view.lines, vec![1]);
    assert_eq!(view.rows, vec!["l1 error"]);
}

#[test]
fn test_no_included_filters_shows_all_but_excluded() {
    let excluded = cached_filter(
        FilterSpec::text("x").with_disposition(Disposition::Excluded),
        &[4],
    );
    let text = "a\nb\nc\nd\nx";

    let view = focus::generate(DOC, text, [&excluded]).unwrap();
    assert_eq!(view.lines, vec![0, 1, 2, 3]);
    assert_eq!(view.rows, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_disposition_none_is_ignored() {
    let ignored = cached_filter(
        FilterSpec::text("a").with_disposition(Disposition::None),
        &[0],
    );
    let view = focus::generate(DOC, "a\nb", [&ignored]).unwrap();
    assert_eq!(view.lines, vec![0, 1]);
}

#[test]
fn test_unanalyzed_filter_yields_no_view() {
    let fresh = Filter::from_spec(&FilterSpec::text("a")).unwrap();
    assert!(focus::generate(DOC, "a", [&fresh]).is_none());
}

#[test]
fn test_cache_read_returns_exactly_what_was_written() {
    let mut cache = ResultCache::new();
    let lines: BTreeSet<usize> = [2, 9, 4].into_iter().collect();
    cache.update(DOC, lines.clone());
    assert!(cache.is_analyzed(DOC));
    assert_eq!(cache.lines(DOC), Some(&lines));

    cache.clear_document(DOC);
    assert_eq!(cache.lines(DOC), None);
}

#[test]
fn test_repeated_requests_do_not_rescan() {
    let mut host = DecorationRegistry::new();
    let mut project = Project::new("p");
    project
        .add_filter(FilterSpec::text("error"), &mut host)
        .unwrap();
    project
        .add_filter(
            FilterSpec::text("debug").with_disposition(Disposition::Excluded),
            &mut host,
        )
        .unwrap();
    let service = AnalysisService::new(project, EngineOptions::default());
    let text = "error\ndebug error\ninfo";

    let first = service.focus(DOC, text).unwrap();
    let second = service.focus(DOC, text).unwrap();
    service.highlight(DOC, text).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.lines, vec![0]);
    assert_eq!(service.scan_count(), 1);
}

#[test]
fn test_disposition_change_updates_focus_view() {
    let mut host = DecorationRegistry::new();
    let mut project = Project::new("p");
    let id = project
        .add_filter(FilterSpec::text("noise"), &mut host)
        .unwrap();
    let service = AnalysisService::new(project, EngineOptions::default());
    let text = "noise\nsignal";

    assert_eq!(service.focus(DOC, text).unwrap().lines, vec![0]);

    service
        .write()
        .unwrap()
        .update_filter(id, FilterEdit::disposition(Disposition::Excluded), &mut host)
        .unwrap();
    assert_eq!(service.focus(DOC, text).unwrap().lines, vec![1]);
}

fn arb_sets() -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    prop::collection::vec(prop::collection::btree_set(0usize..20, 0..8), 0..4)
}

proptest! {
    #[test]
    fn prop_focus_inclusion_law(included in arb_sets(), excluded in arb_sets(), line_count in 0usize..20) {
        let inc: Vec<&BTreeSet<usize>> = included.iter().collect();
        let exc: Vec<&BTreeSet<usize>> = excluded.iter().collect();
        let visible = visible_lines(line_count, &inc, &exc);

        prop_assert!(visible.windows(2).all(|w| w[0] < w[1]));
        for line in 0..line_count {
            let shown = (included.is_empty() || included.iter().any(|s| s.contains(&line)))
                && !excluded.iter().any(|s| s.contains(&line));
            prop_assert_eq!(visible.contains(&line), shown, "line {}", line);
        }
        prop_assert!(visible.iter().all(|&l| l < line_count));
    }
}
