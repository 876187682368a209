//! Interactive prompts using dialoguer

use std::collections::HashMap;

use anyhow::Result;
use dialoguer::Input;

/// Accepted answers for one survey question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnswerKind {
    /// 1 = yes, 0 = no
    YesNo,
    /// Whole number in an inclusive range
    Code { min: i64, max: i64 },
    /// Any finite number in an inclusive range
    Number { min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct Question {
    pub column: &'static str,
    pub prompt: &'static str,
    pub kind: AnswerKind,
}

const fn yes_no(column: &'static str, prompt: &'static str) -> Question {
    Question {
        column,
        prompt,
        kind: AnswerKind::YesNo,
    }
}

/// Raw answers asked by `cardiopipe predict`, in the order they are asked.
pub const SURVEY_QUESTIONS: [Question; 17] = [
    yes_no("HighChol", "High Cholesterol (1 = Yes, 0 = No)"),
    Question {
        column: "BMI",
        prompt: "BMI (Body Mass Index, e.g., 24.5)",
        kind: AnswerKind::Number { min: 0.0, max: 200.0 },
    },
    yes_no("Diabetes", "Diabetes (1 = Yes, 0 = No)"),
    yes_no("PhysActivity", "Physical Activity (1 = Yes, 0 = No)"),
    yes_no("Fruits", "Consumes Fruits Daily (1 = Yes, 0 = No)"),
    yes_no("Veggies", "Consumes Vegetables Daily (1 = Yes, 0 = No)"),
    yes_no("HvyAlcoholConsump", "Heavy Alcohol Consumption (1 = Yes, 0 = No)"),
    Question {
        column: "GenHlth",
        prompt: "General Health (1 = Excellent, 2 = Very Good, 3 = Good, 4 = Fair, 5 = Poor)",
        kind: AnswerKind::Code { min: 1, max: 5 },
    },
    Question {
        column: "MentHlth",
        prompt: "Days of Poor Mental Health (0-30)",
        kind: AnswerKind::Code { min: 0, max: 30 },
    },
    Question {
        column: "PhysHlth",
        prompt: "Days of Poor Physical Health (0-30)",
        kind: AnswerKind::Code { min: 0, max: 30 },
    },
    yes_no("DiffWalk", "Difficulty Walking (1 = Yes, 0 = No)"),
    yes_no("Sex", "Sex (1 = Female, 0 = Male)"),
    Question {
        column: "Education",
        prompt: "Education Level (1 = No Schooling, 2 = Elementary, 3 = Some High School, \
                 4 = High School Graduate, 5 = Some College, 6 = College Graduate)",
        kind: AnswerKind::Code { min: 1, max: 6 },
    },
    yes_no("Current_Smoker", "Current Smoker (1 = Yes, 0 = No)"),
    Question {
        column: "Income_Category",
        prompt: "Income Category (1 = <15K, 2 = 15K-25K, 3 = 25K-35K, 4 = 35K-50K, 5 = 50K+)",
        kind: AnswerKind::Code { min: 1, max: 5 },
    },
    Question {
        column: "Age_Group",
        prompt: "Age Group (1 = 18-24, 2 = 25-34, 3 = 35-44, 4 = 45-54, 5 = 55-64, 6 = 65+)",
        kind: AnswerKind::Code { min: 1, max: 6 },
    },
    yes_no("On_BP_Medication", "On BP Medication (1 = Yes, 0 = No)"),
];

/// Check one answer against its question.
pub fn check_answer(kind: AnswerKind, value: f64) -> Result<(), String> {
    if !value.is_finite() {
        return Err("please enter a number".to_string());
    }
    match kind {
        AnswerKind::YesNo if value == 0.0 || value == 1.0 => Ok(()),
        AnswerKind::YesNo => Err("please enter 1 (yes) or 0 (no)".to_string()),
        AnswerKind::Code { min, max } => {
            if value.fract() != 0.0 || value < min as f64 || value > max as f64 {
                Err(format!("please enter a whole number from {} to {}", min, max))
            } else {
                Ok(())
            }
        }
        AnswerKind::Number { min, max } => {
            if value < min || value > max {
                Err(format!("please enter a number from {} to {}", min, max))
            } else {
                Ok(())
            }
        }
    }
}

/// Ask every survey question and collect the raw answers by column name.
pub fn prompt_survey_answers() -> Result<HashMap<String, f64>> {
    let mut answers = HashMap::with_capacity(SURVEY_QUESTIONS.len());
    for question in SURVEY_QUESTIONS {
        let value: f64 = Input::new()
            .with_prompt(question.prompt)
            .validate_with(|v: &f64| check_answer(question.kind, *v))
            .interact_text()?;
        answers.insert(question.column.to_string(), value);
    }
    Ok(answers)
}
