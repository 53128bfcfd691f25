use common::{
    config::{Config, Settings},
    plot::Report,
};
use tracing::debug;

pub use method_comparison::MethodComparison;
pub use thread_scaling::ThreadScaling;
pub use timing_table::TimingTable;

/// The four comparison reports, with the constants tuned for the coloring benchmark graphs
pub fn default_reports() -> Vec<Box<dyn Report>> {
    vec![
        Box::new(MethodComparison::all_graphs()),
        Box::new(MethodComparison::without_outliers()),
        Box::new(MethodComparison::graph_family()),
        Box::new(ThreadScaling::parallel_methods()),
    ]
}

pub fn default_config() -> Config {
    Config {
        settings: Settings::default(),
        reports: default_reports(),
    }
}

/// Touches every report type so their YAML registrations are linked into the binary
pub fn init_reports() {
    let reports: [Box<dyn Report>; 3] = [
        Box::new(MethodComparison::all_graphs()),
        Box::new(ThreadScaling::parallel_methods()),
        Box::new(TimingTable::default()),
    ];
    for report in reports {
        debug!("Report available: {report:?}");
    }
}
