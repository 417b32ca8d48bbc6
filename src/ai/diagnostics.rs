use std::fmt;
use std::time::{Duration, Instant};

use crate::models::{ProviderId, SummaryOptions};

use super::provider::SummaryProvider;

const SAMPLE_CONTENT: &str = "Rust is a systems programming language focused on safety, speed and \
concurrency. It prevents memory errors at compile time through ownership and borrowing, \
without a garbage collector. Teams adopt it for command line tools, network services and \
embedded firmware.";

#[derive(Debug, Clone)]
pub struct DiagnosticStep {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct DiagnosticReport {
    pub provider: ProviderId,
    pub model: String,
    pub steps: Vec<DiagnosticStep>,
}

impl DiagnosticReport {
    pub fn passed(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.passed)
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}): {}",
            self.provider.config().display_name,
            self.model,
            if self.passed() { "OK" } else { "FAILED" }
        )?;
        for step in &self.steps {
            writeln!(
                f,
                "  [{}] {:<15} {:>6} ms  {}",
                if step.passed { "pass" } else { "fail" },
                step.name,
                step.elapsed.as_millis(),
                step.detail
            )?;
        }
        Ok(())
    }
}

/// Configuration, authentication and a sample generation. Stops at the first failing step.
pub async fn test_api_connection(
    provider: &dyn SummaryProvider,
    has_api_key: bool,
) -> DiagnosticReport {
    let mut report = DiagnosticReport {
        provider: provider.id(),
        model: provider.model().to_string(),
        steps: Vec::with_capacity(3),
    };

    let started = Instant::now();
    let configured = has_api_key && !provider.model().is_empty();
    report.steps.push(DiagnosticStep {
        name: "configuration",
        passed: configured,
        detail: if configured {
            format!("model {}", provider.model())
        } else if !has_api_key {
            format!("no API key (set {})", provider.id().api_key_env())
        } else {
            "no model configured".to_string()
        },
        elapsed: started.elapsed(),
    });
    if !configured {
        return report;
    }

    let started = Instant::now();
    let auth = provider.validate_credentials().await;
    report.steps.push(DiagnosticStep {
        name: "authentication",
        passed: auth.is_ok(),
        detail: match &auth {
            Ok(()) => "credentials accepted".to_string(),
            Err(e) => e.to_string(),
        },
        elapsed: started.elapsed(),
    });
    if auth.is_err() {
        return report;
    }

    let options = SummaryOptions {
        max_length: 30,
        ..SummaryOptions::default()
    };
    let started = Instant::now();
    let generation = provider.generate_summary(SAMPLE_CONTENT, &options).await;
    report.steps.push(DiagnosticStep {
        name: "generation",
        passed: generation.is_ok(),
        detail: match &generation {
            Ok(result) => format!(
                "{} tokens in {:.2}s{}",
                result.tokens_used,
                result.generation_time,
                if result.cached { " (cached)" } else { "" }
            ),
            Err(e) => e.to_string(),
        },
        elapsed: started.elapsed(),
    });

    report
}
