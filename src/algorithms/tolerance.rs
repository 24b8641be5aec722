use crate::pipeline::types::{Statistic, StatisticsSummary, ToleranceSpec, Verdict, Violation};

/// Hold each statistic against its ceiling.
///
/// All four statistics are always checked. A value equal to its ceiling
/// passes; a NaN never does.
pub fn evaluate(summary: &StatisticsSummary, spec: &ToleranceSpec) -> Verdict {
    let violations: Vec<Violation> = Statistic::ALL
        .iter()
        .filter_map(|&statistic| {
            let observed = statistic.observed(summary);
            let ceiling = statistic.ceiling(spec);
            exceeds(observed, ceiling).then_some(Violation {
                statistic,
                observed,
                ceiling,
            })
        })
        .collect();

    Verdict {
        passed: violations.is_empty(),
        summary: *summary,
        violations,
    }
}

fn exceeds(observed: f64, ceiling: f64) -> bool {
    observed.is_nan() || observed > ceiling
}
