/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1)
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnStats {
    pub fn from_values(values: &[Option<f64>]) -> Self {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let count = present.len();
        let missing = values.len() - count;

        if count == 0 {
            return Self {
                count,
                missing,
                ..Self::default()
            };
        }

        let mean = present.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            Some(var.sqrt())
        } else {
            None
        };

        Self {
            count,
            missing,
            mean: Some(mean),
            std,
            min: present.iter().copied().reduce(f64::min),
            max: present.iter().copied().reduce(f64::max),
        }
    }
}

/// Before/after comparison for one imputed column.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputationComparison {
    pub column: String,
    pub before: ColumnStats,
    pub after: ColumnStats,
    pub filled: usize,
}

impl ImputationComparison {
    pub fn new(column: &str, before: &[Option<f64>], after: &[Option<f64>]) -> Self {
        let filled = before
            .iter()
            .zip(after)
            .filter(|(b, a)| b.is_none() && a.is_some())
            .count();

        Self {
            column: column.to_string(),
            before: ColumnStats::from_values(before),
            after: ColumnStats::from_values(after),
            filled,
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

pub fn comparison_summary(comparisons: &[ImputationComparison]) -> String {
    let mut summary = String::new();

    summary.push_str("=== Imputation Summary ===\n");
    summary.push_str(&format!(
        "{:<14} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>8}\n",
        "Column", "", "count", "missing", "mean", "std", "min", "max"
    ));

    for c in comparisons {
        for (label, stats) in [("before", &c.before), ("after", &c.after)] {
            summary.push_str(&format!(
                "{:<14} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>8}\n",
                if label == "before" { c.column.as_str() } else { "" },
                label,
                stats.count,
                stats.missing,
                fmt_opt(stats.mean),
                fmt_opt(stats.std),
                fmt_opt(stats.min),
                fmt_opt(stats.max)
            ));
        }
        summary.push_str(&format!("{:<14} filled {}\n", "", c.filled));
    }

    summary
}
