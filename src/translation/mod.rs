/*!
 * Translation pipeline.
 *
 * This module turns batches of user-interface strings into stored
 * translations:
 * - `request`: The unit of work handed to the pipeline
 * - `prompt`: Numbered-list prompt construction
 * - `parsing`: Positional parsing of model responses
 * - `batch`: Cache-aware batch orchestration with retry and key rotation
 */

pub mod batch;
pub mod parsing;
pub mod prompt;
pub mod request;

pub use batch::{BatchOutcome, BatchTranslator};
pub use parsing::parse_translation_response;
pub use prompt::build_translation_prompt;
pub use request::TranslationRequest;
