//! Summary tables and the flat run report.

pub mod pathway;
pub mod summary;
pub mod text;

pub use pathway::{summarize_annotations, write_annotation_summary_csv, AnnotationSummary};
pub use summary::{summarize, top_by_effect, write_summaries_csv, SignificanceSummary};
pub use text::{CorrelationEntry, LayerSection, ReportMeta, RunReport, StageState, StageStatus};
