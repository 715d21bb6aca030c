//! Alert executor.
//!
//! Renders the configured message (with `{…}` variable substitution) and
//! suspends on the prompt collaborator. A plain message continues along the
//! default edge once acknowledged; a confirm routes its accept/reject
//! outcome exactly like a branch outcome, so rejection with no configured
//! path ends the run.

use crate::design::{AlertConfig, AlertKind, EdgeLabel, Node};
use crate::nodes::{RunContext, resolve_outcome};
use crate::resolver::render_template;
use crate::runner::RunnerError;

pub async fn run(
    cfg: &AlertConfig,
    node: &Node,
    cx: &mut RunContext<'_>,
) -> Result<Option<String>, RunnerError> {
    let message = render_template(&cfg.message, cx.vars, cx.env.identity.as_ref());

    match cfg.alert_type {
        AlertKind::Message => {
            cx.env.prompter.alert(&message).await;
            Ok(cx.design.default_target(&node.id).map(String::from))
        }
        AlertKind::Confirm => {
            let accepted = cx.env.prompter.confirm(&message).await;
            tracing::debug!(node = %node.id, accepted, "confirm answered");
            let next = if accepted {
                resolve_outcome(
                    cx.design,
                    &node.id,
                    cfg.true_action.as_ref(),
                    EdgeLabel::True,
                    true,
                )
            } else {
                resolve_outcome(
                    cx.design,
                    &node.id,
                    cfg.false_action.as_ref(),
                    EdgeLabel::False,
                    false,
                )
            };
            Ok(next)
        }
    }
}
