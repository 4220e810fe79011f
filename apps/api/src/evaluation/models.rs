use serde::Serialize;

use crate::evaluation::error::EvaluationError;

/// The two documents being compared. Only exists once both passed the blank check.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRequest<'a> {
    resume_text: &'a str,
    job_description_text: &'a str,
}

impl<'a> EvaluationRequest<'a> {
    pub fn new(
        resume_text: &'a str,
        job_description_text: &'a str,
    ) -> Result<Self, EvaluationError> {
        if resume_text.trim().is_empty() {
            return Err(EvaluationError::InvalidInput("resumeText"));
        }
        if job_description_text.trim().is_empty() {
            return Err(EvaluationError::InvalidInput("jobDescriptionText"));
        }
        Ok(Self {
            resume_text,
            job_description_text,
        })
    }

    pub fn resume_text(&self) -> &'a str {
        self.resume_text
    }

    pub fn job_description_text(&self) -> &'a str {
        self.job_description_text
    }
}

/// Validated verdict for one resume against one job description.
///
/// Fields are private: the only constructor is crate-internal and is called by the
/// shape validator after every field has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    fit_score: u8,
    analysis: String,
    strengths: Vec<String>,
    missing: Vec<String>,
}

impl EvaluationResult {
    pub(crate) fn new(
        fit_score: u8,
        analysis: String,
        strengths: Vec<String>,
        missing: Vec<String>,
    ) -> Self {
        Self {
            fit_score,
            analysis,
            strengths,
            missing,
        }
    }

    /// 0 – 100 inclusive.
    pub fn fit_score(&self) -> u8 {
        self.fit_score
    }

    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    pub fn strengths(&self) -> &[String] {
        &self.strengths
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn band(&self) -> FitBand {
        FitBand::from_score(self.fit_score)
    }
}

/// Coarse bucket the portal shows next to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitBand {
    /// 75 and above
    Strong,
    /// 50 – 74
    Moderate,
    /// below 50
    Weak,
}

impl FitBand {
    pub fn from_score(score: u8) -> Self {
        if score >= 75 {
            FitBand::Strong
        } else if score >= 50 {
            FitBand::Moderate
        } else {
            FitBand::Weak
        }
    }
}
