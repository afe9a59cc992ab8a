// ABOUTME: Resolved job definitions with their hooks, branching, delays and limits
// ABOUTME: Converts a merged raw job document into a typed JobSpec with a closed JobKind payload

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::error::{ParserError, Result};
use super::payload::{
    CalculatePayload, InputPayload, OcrPayload, Returns, RoiPayload, SystemPayload,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "ROI")]
    Roi,
    #[serde(rename = "OCR")]
    Ocr,
    Input,
    System,
    Overload,
    Calculate,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Roi => "ROI",
            JobType::Ocr => "OCR",
            JobType::Input => "Input",
            JobType::System => "System",
            JobType::Overload => "Overload",
            JobType::Calculate => "Calculate",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Before {
    pub tasks: Vec<String>,
    pub ignore_errors: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct After {
    pub success: Vec<String>,
    pub failure: Vec<String>,
    pub always: Vec<String>,
    pub ignore_errors: bool,
}

impl After {
    /// `always` jobs followed by the outcome-specific list, first occurrence wins.
    pub fn tasks_for(&self, succeeded: bool) -> Vec<&str> {
        let branch = if succeeded {
            &self.success
        } else {
            &self.failure
        };
        let mut tasks: Vec<&str> = Vec::new();
        for name in self.always.iter().chain(branch.iter()) {
            if !tasks.contains(&name.as_str()) {
                tasks.push(name);
            }
        }
        tasks
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Next {
    Name(String),
    Branch {
        #[serde(default)]
        success: String,
        #[serde(default)]
        failure: String,
    },
}

impl Default for Next {
    fn default() -> Self {
        Next::Name(String::new())
    }
}

impl Next {
    /// The job to follow for an outcome; `None` means the run ends here.
    pub fn target(&self, succeeded: bool) -> Option<&str> {
        let name = match self {
            Next::Name(name) => name,
            Next::Branch { success, .. } if succeeded => success,
            Next::Branch { failure, .. } => failure,
        };
        if name.is_empty() {
            None
        } else {
            Some(name.as_str())
        }
    }
}

/// Milliseconds to wait around the main execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delay {
    pub pre: u64,
    pub post: u64,
}

pub const UNBOUNDED: i64 = -1;

fn unbounded() -> i64 {
    UNBOUNDED
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    #[serde(default = "unbounded")]
    pub max_count: i64,
    #[serde(default = "unbounded")]
    pub max_failure: i64,
    #[serde(default = "unbounded")]
    pub max_success: i64,
    #[serde(default)]
    pub exit: Option<String>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_count: UNBOUNDED,
            max_failure: UNBOUNDED,
            max_success: UNBOUNDED,
            exit: None,
        }
    }
}

impl Limits {
    pub fn exit_target(&self) -> Option<&str> {
        self.exit.as_deref().filter(|name| !name.is_empty())
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "maxCount: {}, maxFailure: {}, maxSuccess: {}, exit: '{}'",
            self.max_count,
            self.max_failure,
            self.max_success,
            self.exit_target().unwrap_or("")
        )
    }
}

/// Type-specific part of a resolved job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
    Roi(RoiPayload),
    Ocr(OcrPayload),
    Input(InputPayload),
    System(SystemPayload),
    Calculate(CalculatePayload),
}

impl JobKind {
    pub fn job_type(&self) -> JobType {
        match self {
            JobKind::Roi(_) => JobType::Roi,
            JobKind::Ocr(_) => JobType::Ocr,
            JobKind::Input(_) => JobType::Input,
            JobKind::System(_) => JobType::System,
            JobKind::Calculate(_) => JobType::Calculate,
        }
    }

    pub fn returns(&self) -> Option<&Returns> {
        match self {
            JobKind::Roi(p) => Some(&p.returns),
            JobKind::Ocr(p) => Some(&p.returns),
            JobKind::Input(p) => p.returns(),
            JobKind::System(p) => Some(&p.returns),
            JobKind::Calculate(p) => Some(&p.returns),
        }
    }
}

/// A job with inheritance resolved. Never `Overload`-typed.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub name: String,
    pub description: String,
    pub before: Before,
    pub after: After,
    pub next: Next,
    pub delay: Delay,
    pub limits: Limits,
    pub needs: Vec<String>,
    pub use_job: Option<String>,
    pub kind: JobKind,
}

#[derive(Debug, Deserialize)]
struct RawJob {
    #[serde(rename = "type")]
    job_type: JobType,
    #[serde(default)]
    description: String,
    #[serde(default)]
    before: Before,
    #[serde(default)]
    after: After,
    #[serde(default)]
    next: Next,
    #[serde(default)]
    delay: Delay,
    #[serde(default)]
    limits: Limits,
    #[serde(default)]
    needs: Vec<String>,
    #[serde(default, rename = "use")]
    use_job: String,
    roi: Option<RoiPayload>,
    ocr: Option<OcrPayload>,
    input: Option<InputPayload>,
    system: Option<SystemPayload>,
    calculate: Option<CalculatePayload>,
}

impl JobSpec {
    /// Build a typed job from a fully merged document entry.
    pub fn from_value(name: &str, value: &Value) -> Result<Self> {
        let raw: RawJob =
            serde_json::from_value(value.clone()).map_err(|e| ParserError::InvalidJob {
                job: name.to_string(),
                reason: e.to_string(),
            })?;

        let missing = |field: &str| ParserError::MissingField {
            job: name.to_string(),
            field: field.to_string(),
        };

        let kind = match raw.job_type {
            JobType::Roi => JobKind::Roi(raw.roi.ok_or_else(|| missing("roi"))?),
            JobType::Ocr => JobKind::Ocr(raw.ocr.unwrap_or_default()),
            JobType::Input => {
                let payload = raw.input.ok_or_else(|| missing("input"))?;
                if let Some(section) = payload.missing_section() {
                    return Err(missing(section));
                }
                JobKind::Input(payload)
            }
            JobType::System => {
                let payload = raw.system.ok_or_else(|| missing("system"))?;
                if let Some(section) = payload.missing_section() {
                    return Err(missing(section));
                }
                JobKind::System(payload)
            }
            JobType::Calculate => {
                JobKind::Calculate(raw.calculate.ok_or_else(|| missing("calculate"))?)
            }
            JobType::Overload => {
                return Err(ParserError::InvalidJob {
                    job: name.to_string(),
                    reason: "overload jobs must be resolved before use".to_string(),
                })
            }
        };

        Ok(Self {
            name: name.to_string(),
            description: raw.description,
            before: raw.before,
            after: raw.after,
            next: raw.next,
            delay: raw.delay,
            limits: raw.limits,
            needs: raw.needs,
            use_job: Some(raw.use_job).filter(|name| !name.is_empty()),
            kind,
        })
    }

    pub fn job_type(&self) -> JobType {
        self.kind.job_type()
    }

    pub fn returns(&self) -> Option<&Returns> {
        self.kind.returns()
    }
}
