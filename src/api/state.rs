use crate::analysis::AnalysisPipeline;
use crate::config::ExportConfig;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    pub export: Arc<ExportConfig>,
}

impl AppState {
    pub fn new(pipeline: AnalysisPipeline, export: ExportConfig) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            export: Arc::new(export),
        }
    }
}
