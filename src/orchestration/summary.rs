//! Outcome summary rendering and delivery
//!
//! Renders the per-build results as the HTML table contributors see on the
//! pull request and on the workflow run page. Scan links come from the
//! publication outcomes and are folded into the loaded metadata before
//! rendering.

use crate::core::config::RepublishConfig;
use crate::core::traits::OutcomeReporter;
use crate::orchestration::outcome::PublishOutcome;
use crate::scans::metadata::BuildMetadata;

const SUMMARY_TITLE: &str = "Build Scans";

const BADGE_PUBLISHED_COLOR: &str = "06A0CE";
const BADGE_NOT_PUBLISHED_COLOR: &str = "lightgrey";
const BADGE_FALLBACK_URL: &str = "https://scans.gradle.com";

/// Renders and delivers the batch summary
pub struct SummaryReporter<'a> {
    config: &'a RepublishConfig,
    reporter: &'a dyn OutcomeReporter,
}

impl<'a> SummaryReporter<'a> {
    pub fn new(config: &'a RepublishConfig, reporter: &'a dyn OutcomeReporter) -> Self {
        Self { config, reporter }
    }

    /// Fold scan links into the metadata, render once, deliver to the
    /// configured targets. An empty batch delivers nothing.
    pub async fn report(
        &self,
        pr_number: u64,
        mut builds: Vec<BuildMetadata>,
        outcomes: &[PublishOutcome],
    ) -> anyhow::Result<()> {
        if builds.is_empty() {
            return Ok(());
        }

        apply_scan_links(&mut builds, outcomes);
        let html = render_html_summary(&builds);

        if !self.config.skip_comment {
            self.reporter.post_comment(pr_number, &html).await?;
        }
        if !self.config.skip_summary {
            self.reporter.add_page_summary(SUMMARY_TITLE, &html).await?;
        }

        Ok(())
    }
}

/// Attach each outcome's scan link to the metadata entry with the same
/// build id; outcomes without a link leave the entry untouched
pub fn apply_scan_links(builds: &mut [BuildMetadata], outcomes: &[PublishOutcome]) {
    for outcome in outcomes {
        let Some(link) = &outcome.scan_link else {
            continue;
        };
        if let Some(build) = builds.iter_mut().find(|b| b.build_id == outcome.build_id) {
            build.build_scan_link = Some(link.clone());
        }
    }
}

/// The HTML table posted as a comment and as the workflow page summary
pub fn render_html_summary(builds: &[BuildMetadata]) -> String {
    let rows: String = builds.iter().map(render_build_row).collect();
    format!(
        "\n<table>\n    <tr>\n        <th>Project</th>\n        <th>Job</th>\n        <th>Requested Tasks</th>\n        \
         <th>Build Tool Version</th>\n        <th>Build Outcome</th>\n        <th>Build Scan®</th>\n    </tr>{}\n</table>\n",
        rows
    )
}

fn render_build_row(build: &BuildMetadata) -> String {
    format!(
        "\n    <tr>\n        <td>{}</td>\n        <td>{}</td>\n        <td>{}</td>\n        <td align='center'>{}</td>\n        \
         <td align='center'>{}</td>\n        <td>{}</td>\n    </tr>",
        build.project_id,
        build.job_name,
        build.requested_tasks,
        build.build_tool_version,
        render_outcome(build),
        render_scan_badge(build),
    )
}

fn render_outcome(build: &BuildMetadata) -> &'static str {
    if build.build_failure {
        ":x:"
    } else {
        ":white_check_mark:"
    }
}

fn render_scan_badge(build: &BuildMetadata) -> String {
    match &build.build_scan_link {
        Some(link) => render_badge("PUBLISHED", BADGE_PUBLISHED_COLOR, link),
        None => render_badge("NOT_PUBLISHED", BADGE_NOT_PUBLISHED_COLOR, BADGE_FALLBACK_URL),
    }
}

fn render_badge(outcome_text: &str, outcome_color: &str, target_url: &str) -> String {
    let badge_url = format!(
        "https://img.shields.io/badge/Build%20Scan%C2%AE-{}-{}?logo=Gradle",
        outcome_text, outcome_color
    );
    format!(
        "<a href=\"{}\" rel=\"nofollow\"><img src=\"{}\" alt=\"Build Scan {}\" /></a>",
        target_url, badge_url, outcome_text
    )
}
