//! Jump executor.
//!
//! Builds the target page URL (template substitution plus resolved query
//! parameters) and hands it to the navigation collaborator as a
//! fire-and-forget side effect. Navigation normally ends the run; with
//! `continueFlow` set, execution proceeds to the default next node after the
//! navigation is triggered.

use crate::design::{JumpConfig, Node};
use crate::env::NavigationRequest;
use crate::nodes::RunContext;
use crate::resolver::{render_template, resolve_operand};
use crate::runner::RunnerError;
use crate::value::display_string;

pub async fn run(
    cfg: &JumpConfig,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<Option<String>, RunnerError> {
    match cfg.target.as_deref().filter(|t| !t.trim().is_empty()) {
        Some(target) => {
            let url = build_url(target, cfg, cx);
            tracing::debug!(node = %node.id, url = %url, mode = ?cfg.open_mode, "jump navigation");
            cx.env.navigator.navigate(NavigationRequest {
                url,
                mode: cfg.open_mode,
            });
        }
        None => {
            tracing::warn!(node = %node.id, "jump node has no target; skipping navigation");
        }
    }

    if cfg.continue_flow {
        Ok(cx.design.default_target(&node.id).map(String::from))
    } else {
        Ok(None)
    }
}

fn build_url(target: &str, cfg: &JumpConfig, cx: &RunContext<'_>) -> String {
    let base = render_template(target, cx.vars, cx.env.identity.as_ref());
    if cfg.params.is_empty() {
        return base;
    }

    let query: Vec<String> = cfg
        .params
        .iter()
        .map(|param| {
            let value = resolve_operand(&param.value, cx.vars, cx.env.identity.as_ref());
            format!(
                "{}={}",
                encode_component(&param.name),
                encode_component(&display_string(&value))
            )
        })
        .collect();

    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{}", query.join("&"))
}

/// Minimal query-component escaping for the characters that would break the
/// query string itself.
fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '&' => out.push_str("%26"),
            '=' => out.push_str("%3D"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '%' => out.push_str("%25"),
            other => out.push(other),
        }
    }
    out
}
