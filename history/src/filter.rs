use disk_bench_model::RunSummary;
use itertools::Itertools;

/// Group run summaries by fingerprint, each group sorted oldest first.
pub fn run_summaries_by_config(summary_runs: Vec<RunSummary>) -> Vec<(String, Vec<RunSummary>)> {
    summary_runs
        .into_iter()
        .into_group_map_by(|summary| summary.fingerprint())
        .into_iter()
        .map(|(fingerprint, mut summaries)| {
            summaries.sort_by_key(|summary| summary.started_at);
            (fingerprint, summaries)
        })
        .collect::<Vec<_>>()
}

/// The two most recent runs that can be compared with each other, oldest first.
///
/// Only runs with the same fingerprint are comparable. Of all configurations that ran at least
/// twice, the one that ran most recently is picked.
pub fn latest_comparable_runs(summary_runs: Vec<RunSummary>) -> Option<(RunSummary, RunSummary)> {
    run_summaries_by_config(summary_runs)
        .into_iter()
        .filter(|(_, summaries)| summaries.len() >= 2)
        .max_by_key(|(_, summaries)| summaries.last().map(|s| s.started_at))
        .and_then(|(_, mut summaries)| {
            let newer = summaries.pop()?;
            let older = summaries.pop()?;
            Some((older, newer))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use disk_bench_model::{BenchmarkConfig, Mode};
    use pretty_assertions::assert_eq;

    fn summary(run_id: &str, started_at: i64, mode: Mode) -> RunSummary {
        RunSummary::new(
            run_id.to_string(),
            started_at,
            BenchmarkConfig {
                mode,
                ..Default::default()
            },
            13,
            Some("fio-3.36".to_string()),
            "0.3.0".to_string(),
        )
    }

    fn ids(pair: Option<(RunSummary, RunSummary)>) -> Option<(String, String)> {
        pair.map(|(a, b)| (a.run_id, b.run_id))
    }

    #[test]
    fn groups_are_sorted_oldest_first() {
        let groups = run_summaries_by_config(vec![
            summary("b", 20, Mode::Lean),
            summary("a", 10, Mode::Lean),
            summary("c", 15, Mode::Full),
        ]);

        assert_eq!(groups.len(), 2);
        let lean = groups
            .iter()
            .find(|(_, runs)| runs.len() == 2)
            .map(|(_, runs)| runs.iter().map(|r| r.run_id.as_str()).collect::<Vec<_>>());
        assert_eq!(lean, Some(vec!["a", "b"]));
    }

    #[test]
    fn picks_latest_pair_with_matching_config() {
        let pair = latest_comparable_runs(vec![
            summary("lean-1", 10, Mode::Lean),
            summary("full-1", 20, Mode::Full),
            summary("lean-2", 30, Mode::Lean),
            summary("full-2", 40, Mode::Full),
            summary("test-1", 50, Mode::Test),
            summary("lean-3", 35, Mode::Lean),
        ]);

        assert_eq!(
            ids(pair),
            Some(("full-1".to_string(), "full-2".to_string()))
        );
    }

    #[test]
    fn no_pair_without_repeated_config() {
        let pair = latest_comparable_runs(vec![
            summary("lean-1", 10, Mode::Lean),
            summary("full-1", 20, Mode::Full),
        ]);

        assert_eq!(ids(pair), None);
        assert_eq!(ids(latest_comparable_runs(Vec::new())), None);
    }
}
