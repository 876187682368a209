//! One runner per pipeline stage
//!
//! Each runner loads its input, calls into the library, prints a summary and
//! writes its output. Errors carry the file path that caused them.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use console::style;

use crate::model::{train_ensemble, ModelFamily, TrainConfig};
use crate::pipeline::{
    bin_survey_frame, class_counts, collapse_to_binary, combine_files, extract_survey, get_features_above_threshold,
    load_raw_survey, load_table, profile_columns, read_label_codes, save_dataset, BinConfig, CombineConfig,
    ExtractConfig, LabelEncoding, SurveySchema,
};
use crate::predictor::Predictor;
use crate::report::{
    display_classification_report, display_extraction, display_profiles, display_search_results,
    export_training_report, TrainingReport,
};
use crate::utils::{
    create_spinner, finish_with_success, print_completion, print_config, print_count, print_info, print_loaded,
    print_saved, print_step_header, print_success, print_warning,
};

use super::prompts::prompt_survey_answers;

/// Columns missing more than this share of answers are called out after extraction.
const SPARSE_COLUMN_RATIO: f64 = 0.1;

/// Flags of the `extract` subcommand.
pub struct ExtractArgs {
    pub year: String,
    pub data_dir: PathBuf,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub schema: Option<PathBuf>,
}

impl ExtractArgs {
    pub fn into_config(self) -> Result<ExtractConfig> {
        let mut config = ExtractConfig::for_year(&self.data_dir, &self.year);
        if let Some(input) = self.input {
            config.source = input;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(schema) = self.schema {
            config.schema = SurveySchema::from_json_file(&schema)?;
        }
        Ok(config)
    }
}

pub fn run_extract(config: &ExtractConfig) -> Result<()> {
    print_config(
        "⚙️  Extract",
        &[
            ("Year:", config.year.clone()),
            ("Input:", config.source.display().to_string()),
            ("Output:", config.output.display().to_string()),
        ],
    );

    let start = Instant::now();
    let spinner = create_spinner("Reading raw survey...");
    let raw = load_raw_survey(&config.source)?;
    finish_with_success(&spinner, &format!("Loaded {} rows x {} columns", raw.height(), raw.width()));

    let spinner = create_spinner("Cleaning answers and deriving labels...");
    let (mut cleaned, report) = extract_survey(&raw, &config.schema)?;
    finish_with_success(&spinner, "Extraction complete");

    display_extraction(&report);
    let sparse = get_features_above_threshold(&report.missing_ratios, SPARSE_COLUMN_RATIO);
    if !sparse.is_empty() {
        print_warning(&format!(
            "More than {:.0}% of answers missing in: {}",
            SPARSE_COLUMN_RATIO * 100.0,
            sparse.join(", ")
        ));
    }
    if report.rows_out == 0 {
        print_warning("Every row was dropped; the cleaned table is empty");
    }
    save_dataset(&mut cleaned, &config.output)?;
    println!();
    print_saved("Cleaned table:", &config.output);
    print_info(&format!("Finished in {:.2?}", start.elapsed()));
    print_completion("Extraction");
    Ok(())
}

pub fn run_combine(config: &CombineConfig) -> Result<()> {
    for input in &config.inputs {
        print_loaded("Input:", input);
    }
    let spinner = create_spinner("Combining tables...");
    let mut combined = combine_files(config)?;
    finish_with_success(&spinner, "Tables combined");

    print_count("rows", combined.height(), Some(&format!("from {} inputs", config.inputs.len())));
    save_dataset(&mut combined, &config.output)?;
    print_saved("Combined table:", &config.output);
    print_completion("Combine");
    Ok(())
}

pub fn run_bin(input: &Path, output: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            print_loaded("Binning rules:", path);
            BinConfig::from_json_file(path)?
        }
        None => BinConfig::default(),
    };
    print_loaded("Input:", input);
    let df = load_table(input)?;

    let spinner = create_spinner("Binning BMI and health day-counts...");
    let mut binned = bin_survey_frame(&df, &config)?;
    finish_with_success(&spinner, "Binning complete");

    for rule in &config.rules {
        print_count(
            &format!("bins for {}", rule.column),
            rule.bins.n_bins(),
            Some(&format!("edges {:?}", rule.bins.edges())),
        );
    }
    print_success(&format!("{} = {} OR {}", config.merged, config.merge.0, config.merge.1));

    save_dataset(&mut binned, output)?;
    print_saved("Binned table:", output);
    print_completion("Binning");
    Ok(())
}

pub fn run_relabel(input: &Path, output: Option<&Path>, column: &str) -> Result<()> {
    let output = output.unwrap_or(input);
    print_loaded("Input:", input);
    let df = load_table(input)?;

    let mut relabelled = collapse_to_binary(&df, column)?;
    let codes = read_label_codes(&relabelled, column)?;
    for (class, count) in class_counts(&codes) {
        let name = if class == 1 { "disease-present" } else { "healthy" };
        print_count(&format!("rows labelled {} ({})", class, name), count, Some(&format!("of {}", codes.len())));
    }

    save_dataset(&mut relabelled, output)?;
    print_saved("Relabelled table:", output);
    print_completion("Relabel");
    Ok(())
}

pub fn run_inspect(input: &Path, limit: usize) -> Result<()> {
    let df = load_table(input)?;
    print_loaded("Input:", input);
    print_count("columns", df.width(), Some(&format!("{} rows", df.height())));
    let profiles = profile_columns(&df, limit)?;
    display_profiles(&profiles);
    Ok(())
}

/// Flags of the `train` subcommand; each one overrides the config file.
pub struct TrainArgs {
    pub input: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub test_size: Option<f64>,
    pub n_iter: Option<usize>,
    pub cv_folds: Option<usize>,
    pub seed: Option<u64>,
    pub families: Vec<ModelFamily>,
}

impl TrainArgs {
    pub fn into_config(self) -> Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_json_file(path)?,
            None => TrainConfig::default(),
        };
        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.artifact_path = output;
        }
        if let Some(report) = self.report {
            config.report_path = Some(report);
        }
        if let Some(test_size) = self.test_size {
            config.test_size = test_size;
        }
        if let Some(n_iter) = self.n_iter {
            config.n_iter = n_iter;
        }
        if let Some(cv_folds) = self.cv_folds {
            config.cv_folds = cv_folds;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if !self.families.is_empty() {
            config.families = self.families;
        }
        Ok(config)
    }
}

pub fn run_train(config: &TrainConfig) -> Result<()> {
    let families: Vec<&str> = config.families.iter().map(|f| f.name()).collect();
    print_config(
        "⚙️  Train",
        &[
            ("Input:", config.input.display().to_string()),
            ("Target:", config.target_column.clone()),
            ("Model:", config.artifact_path.display().to_string()),
            ("Families:", families.join(", ")),
            ("Search:", format!("{} candidates, {}-fold CV", config.n_iter, config.cv_folds)),
            ("Test size:", format!("{:.0}%", config.test_size * 100.0)),
        ],
    );

    print_step_header(1, "Load Training Data");
    let df = load_table(&config.input)?;
    print_count("rows", df.height(), Some(&format!("{} columns", df.width())));

    print_step_header(2, "Hyperparameter Search");
    let start = Instant::now();
    let spinner = create_spinner("Searching and fitting every model family...");
    let outcome = train_ensemble(&df, config)?;
    finish_with_success(&spinner, &format!("Ensemble fitted in {:.1?}", start.elapsed()));
    display_search_results(&outcome.searches);

    print_step_header(3, "Held-out Evaluation");
    display_classification_report(&outcome.report);

    print_step_header(4, "Save");
    outcome.artifact.save(&config.artifact_path)?;
    print_saved("Model artifact:", &config.artifact_path);
    if let Some(report_path) = &config.report_path {
        export_training_report(&TrainingReport::new(config, &outcome), report_path)?;
        print_saved("Training report:", report_path);
    }
    print_completion("Training");
    Ok(())
}

pub fn run_predict(model: &Path) -> Result<()> {
    let predictor = Predictor::load(model)?;
    println!(
        "\n    {}\n",
        style("Please provide the following information for heart disease prediction:").bold()
    );
    let answers = prompt_survey_answers()?;
    let prediction = predictor.predict_answers(&answers)?;

    println!();
    println!(
        "    Probability of heart disease: {}",
        style(format!("{:.1}%", prediction.probability * 100.0)).red().bold()
    );
    let encoding = predictor.label_encoding();
    if encoding == LabelEncoding::FourWay {
        println!(
            "    Predicted class: {}",
            style(encoding.describe(prediction.class)).yellow().bold()
        );
    }
    println!();
    Ok(())
}
