use cohost_core::error::GenerationError;
use cohost_core::model::Comment;

use crate::services::{GenerationService, SizeClass};

/// Reserved answer meaning "none of these deserves a reply".
pub const NONE_SENTINEL: &str = "NONE";

/// Pick at most one comment to answer.
///
/// A single pending comment is taken as-is; only larger batches are put to
/// the generation service, whose answer must be one of the listed ids or
/// [`NONE_SENTINEL`].
pub async fn select<'a>(
    generation: &dyn GenerationService,
    comments: &'a [Comment],
) -> Result<Option<&'a Comment>, GenerationError> {
    match comments {
        [] => Ok(None),
        [only] => Ok(Some(only)),
        many => {
            let answer = generation.complete(&selection_prompt(many), SizeClass::Small).await?;
            Ok(resolve(&answer, many))
        }
    }
}

fn selection_prompt(comments: &[Comment]) -> String {
    let mut s = String::from(
        "You are moderating a live chat. Pick the single most recent, relevant comment worth answering.\n",
    );
    for c in comments {
        s.push_str(&format!("[{}] {}: {}\n", c.id, c.author_name, c.text));
    }
    s.push_str(&format!("Reply with the id only, or {NONE_SENTINEL} if none deserve a reply."));
    s
}

fn resolve<'a>(answer: &str, comments: &'a [Comment]) -> Option<&'a Comment> {
    let id = answer
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '[' || c == ']' || c == '`')
        .trim();
    if id.eq_ignore_ascii_case(NONE_SENTINEL) {
        return None;
    }
    comments.iter().find(|c| c.id == id)
}
