use crate::models::StationMapping;
use crate::utils::coordinates::haversine_distance;
use std::collections::HashSet;

/// A daily station and the normals station it was paired with.
#[derive(Debug, Clone, PartialEq)]
pub struct StationConnection {
    pub daily_station: String,
    pub daily_name: Option<String>,
    pub daily: (f64, f64),
    pub normal_station: String,
    pub normal: (f64, f64),
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct DistanceStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionReport {
    /// Distinct daily station ids seen in the input
    pub unique_stations: usize,
    /// Rows left after keeping the first row per daily station
    pub grouped_rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub distance: Option<DistanceStats>,
    pub connections: Vec<StationConnection>,
}

impl ConnectionReport {
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Station Connections ===\n");
        summary.push_str(&format!(
            "Number of unique stations in the original dataframe: {}\n",
            self.unique_stations
        ));
        summary.push_str(&format!(
            "Number of rows after grouping: {}\n",
            self.grouped_rows
        ));
        summary.push_str(&format!("Plottable connections: {}\n", self.matched));
        summary.push_str(&format!(
            "Stations without a located normal: {}\n",
            self.unmatched
        ));

        if let Some(ref d) = self.distance {
            summary.push_str(&format!(
                "Distance (km): min {:.2}, median {:.2}, mean {:.2}, max {:.2}\n",
                d.min / 1000.0,
                d.median / 1000.0,
                d.mean / 1000.0,
                d.max / 1000.0
            ));
        }

        if !self.connections.is_empty() {
            let mut farthest: Vec<&StationConnection> = self
                .connections
                .iter()
                .filter(|c| c.distance.is_some())
                .collect();
            farthest.sort_by(|a, b| {
                b.distance
                    .unwrap_or(0.0)
                    .total_cmp(&a.distance.unwrap_or(0.0))
            });
            if !farthest.is_empty() {
                summary.push_str("\nFarthest pairs:\n");
                for (i, c) in farthest.iter().take(5).enumerate() {
                    summary.push_str(&format!(
                        "  {}. {} ({}) -> {}: {:.2} km\n",
                        i + 1,
                        c.daily_station,
                        c.daily_name.as_deref().unwrap_or("unnamed"),
                        c.normal_station,
                        c.distance.unwrap_or(0.0) / 1000.0
                    ));
                }
            }
        }

        summary
    }
}

/// Turns station mappings into connection diagnostics.
pub struct ConnectionAnalyzer;

impl ConnectionAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze mapping rows, keeping the first row per daily station
    pub fn analyze<'a, I>(&self, mappings: I) -> ConnectionReport
    where
        I: IntoIterator<Item = &'a StationMapping>,
    {
        let mut seen = HashSet::new();
        let mut report = ConnectionReport::default();

        for mapping in mappings {
            if !seen.insert(mapping.daily_station.clone()) {
                continue;
            }
            report.grouped_rows += 1;

            let connection = match (
                mapping.daily_coordinates(),
                mapping.normal_station.as_ref(),
                mapping.normal_coordinates(),
            ) {
                (Some(daily), Some(normal_station), Some(normal)) => StationConnection {
                    daily_station: mapping.daily_station.clone(),
                    daily_name: mapping.daily_station_name.clone(),
                    daily,
                    normal_station: normal_station.clone(),
                    normal,
                    // Mapping files written without a Distance column
                    distance: mapping.distance.or_else(|| {
                        Some(haversine_distance(daily.1, daily.0, normal.1, normal.0) * 1000.0)
                    }),
                },
                _ => {
                    report.unmatched += 1;
                    continue;
                }
            };
            report.connections.push(connection);
        }

        report.unique_stations = seen.len();
        report.matched = report.connections.len();
        report.distance = distance_stats(
            report
                .connections
                .iter()
                .filter_map(|c| c.distance)
                .collect(),
        );
        report
    }
}

impl Default for ConnectionAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn distance_stats(mut distances: Vec<f64>) -> Option<DistanceStats> {
    if distances.is_empty() {
        return None;
    }
    distances.sort_by(|a, b| a.total_cmp(b));

    let n = distances.len();
    let median = if n % 2 == 0 {
        (distances[n / 2 - 1] + distances[n / 2]) / 2.0
    } else {
        distances[n / 2]
    };

    Some(DistanceStats {
        min: distances[0],
        max: distances[n - 1],
        mean: distances.iter().sum::<f64>() / n as f64,
        median,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(daily: &str, normal: Option<&str>, distance: Option<f64>) -> StationMapping {
        StationMapping {
            daily_station: daily.to_string(),
            daily_long: Some(-121.0),
            daily_lat: Some(38.0),
            daily_county: None,
            daily_station_name: Some(format!("{} NAME", daily)),
            normal_station: normal.map(str::to_string),
            normal_long: normal.map(|_| -121.1),
            normal_lat: normal.map(|_| 38.1),
            normal_county: None,
            distance,
        }
    }

    #[test]
    fn test_first_row_per_station() {
        let rows = vec![
            mapping("A", Some("N1"), Some(1000.0)),
            mapping("A", Some("N2"), Some(9000.0)),
            mapping("B", Some("N1"), Some(3000.0)),
            mapping("C", None, None),
        ];

        let report = ConnectionAnalyzer::new().analyze(&rows);

        assert_eq!(report.unique_stations, 3);
        assert_eq!(report.grouped_rows, 3);
        assert_eq!(report.matched, 2);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.connections[0].normal_station, "N1");

        let stats = report.distance.clone().unwrap();
        assert_eq!(stats.min, 1000.0);
        assert_eq!(stats.max, 3000.0);
        assert_eq!(stats.median, 2000.0);
        assert!(report.summary().contains("Number of rows after grouping: 3"));
    }

    #[test]
    fn test_missing_distance_falls_back_to_great_circle() {
        let rows = vec![mapping("A", Some("N1"), None)];
        let report = ConnectionAnalyzer::new().analyze(&rows);

        let distance = report.connections[0].distance.unwrap();
        assert!(distance > 13_000.0 && distance < 15_000.0);
    }

    #[test]
    fn test_empty_input() {
        let report = ConnectionAnalyzer::new().analyze(std::iter::empty());
        assert_eq!(report.unique_stations, 0);
        assert!(report.distance.is_none());
    }
}
