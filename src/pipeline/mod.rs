//! Pipeline module - the data-preparation stages ahead of training

pub mod binning;
pub mod combine;
pub mod error;
pub mod extract;
pub mod inspect;
pub mod label;
pub mod loader;
pub mod missing;
pub mod schema;

pub use binning::{bin_survey_frame, engineer_answers, BinConfig, BinRule, IntervalBins};
pub use combine::{combine_files, combine_tables, CombineConfig};
pub use error::{BinningError, LabelError, SchemaError};
pub use extract::{extract_survey, ExtractConfig, ExtractionReport};
pub use inspect::{profile_columns, ColumnProfile, NumericStats};
pub use label::{class_counts, collapse_to_binary, read_label_codes, HeartDiseaseStatus, LabelEncoding};
pub use loader::*;
pub use missing::*;
pub use schema::{ColumnRole, ColumnSpec, Indicator, SurveySchema, FEATURE_COLUMNS, TARGET_COLUMN};
