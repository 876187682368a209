//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::model::ModelFamily;

/// cardiopipe - heart-disease survey pipeline, ensemble trainer and predictor
#[derive(Parser, Debug)]
#[command(name = "cardiopipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean one raw yearly survey CSV into the model's column layout
    Extract {
        /// Survey year; selects {year}.csv and preprocessed{year}.csv
        #[arg(short, long, default_value = "2015")]
        year: String,

        /// Directory holding the yearly files
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,

        /// Raw survey file (overrides the year-derived path)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file, CSV or Parquet by extension (overrides the year-derived path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON column schema replacing the built-in survey layout
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Concatenate cleaned tables from several years
    Combine {
        /// Cleaned tables; the first one fixes column order and types
        #[arg(
            short,
            long,
            num_args = 1..,
            default_values = ["preprocessed2015.csv", "preprocessed2013.csv"]
        )]
        inputs: Vec<PathBuf>,

        #[arg(short, long, default_value = "finaldataset.csv")]
        output: PathBuf,
    },

    /// Discretize BMI and day-counts and merge the diet flags
    Bin {
        #[arg(short, long, default_value = "finaldataset.csv")]
        input: PathBuf,

        #[arg(short, long, default_value = "binned.csv")]
        output: PathBuf,

        /// JSON binning rules; the built-in edges are used when absent
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Collapse the four-valued outcome label to healthy (0) / disease (1)
    Relabel {
        #[arg(short, long, default_value = "smote.csv")]
        input: PathBuf,

        /// Output file (defaults to rewriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Label column to rewrite
        #[arg(long, default_value = crate::pipeline::TARGET_COLUMN)]
        column: String,
    },

    /// Show type, nulls, unique values and statistics for every column
    Inspect {
        #[arg(short, long, default_value = "smote.csv")]
        input: PathBuf,

        /// Maximum unique values listed per column
        #[arg(long, default_value = "20", value_parser = validate_limit)]
        limit: usize,
    },

    /// Search hyperparameters per family and fit the soft-voting ensemble
    Train {
        /// Training table (overrides the config file)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// JSON training config; flags given on the command line take precedence
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Model artifact output path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Training report output path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Fraction of rows held out for evaluation
        #[arg(long, value_parser = validate_fraction)]
        test_size: Option<f64>,

        /// Sampled candidates per family
        #[arg(long)]
        n_iter: Option<usize>,

        /// Cross-validation folds
        #[arg(long, value_parser = validate_folds)]
        cv_folds: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Families to include (comma-separated)
        #[arg(long, value_delimiter = ',', value_parser = parse_family)]
        families: Vec<ModelFamily>,
    },

    /// Answer the survey questions interactively and print the risk
    Predict {
        #[arg(short, long, default_value = "ensemble_model.json")]
        model: PathBuf,
    },

    /// Serve POST /predict over HTTP
    Serve {
        #[arg(short, long, default_value = "ensemble_model.json")]
        model: PathBuf,

        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

fn parse_family(s: &str) -> Result<ModelFamily, String> {
    ModelFamily::ALL
        .into_iter()
        .find(|f| f.name() == s.trim())
        .ok_or_else(|| {
            let names: Vec<&str> = ModelFamily::ALL.iter().map(|f| f.name()).collect();
            format!("unknown model family '{}', expected one of: {}", s, names.join(", "))
        })
}

/// Validator for test_size
fn validate_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("test_size must be between 0.0 and 1.0 (exclusive), got {}", value))
    }
}

/// Validator for cv_folds
fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value < 2 {
        Err(format!("cv_folds must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}

fn validate_limit(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;
    if value == 0 {
        Err("limit must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_defaults() {
        let cli = Cli::try_parse_from(["cardiopipe", "combine"]).unwrap();
        match cli.command {
            Commands::Combine { inputs, output } => {
                assert_eq!(
                    inputs,
                    vec![PathBuf::from("preprocessed2015.csv"), PathBuf::from("preprocessed2013.csv")]
                );
                assert_eq!(output, PathBuf::from("finaldataset.csv"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_train_families_parse() {
        let cli = Cli::try_parse_from(["cardiopipe", "train", "--families", "naive_bayes,random_forest"]).unwrap();
        match cli.command {
            Commands::Train { families, .. } => {
                assert_eq!(families, vec![ModelFamily::NaiveBayes, ModelFamily::RandomForest]);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["cardiopipe", "train", "--families", "svm"]).is_err());
    }

    #[test]
    fn test_validators() {
        assert!(validate_fraction("0.4").is_ok());
        assert!(validate_fraction("1.0").is_err());
        assert!(validate_fraction("abc").is_err());
        assert!(validate_folds("1").is_err());
        assert_eq!(validate_folds("3"), Ok(3));
        assert!(validate_limit("0").is_err());
    }
}
