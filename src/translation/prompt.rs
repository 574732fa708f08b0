/*!
 * Prompt construction for batch translation.
 *
 * Prompts present the texts as a numbered list and instruct the model
 * to answer with the same numbering, which lets the response parser
 * pair translations back to their sources by position.
 */

use crate::language_utils::dialect_name;

/// Build a numbered-list translation prompt for a homogeneous chunk
///
/// All texts must share the same language pair. The dialect name makes
/// regional variants explicit, e.g. "pt" always requests European
/// Portuguese rather than Brazilian Portuguese.
pub fn build_translation_prompt(
    texts: &[String],
    source_lang: &str,
    target_lang: &str,
    category: &str,
    context: Option<&str>,
) -> String {
    let source_name = dialect_name(source_lang);
    let target_name = dialect_name(target_lang);

    let mut prompt = format!(
        "Translate the following {count} user interface strings for a web application \
         from {source_name} to {target_name}.\n\n\
         Rules:\n\
         - Keep translations short and natural for UI elements ({category})\n\
         - Preserve placeholders like {{name}} and formatting exactly\n\
         - Reply with exactly {count} numbered lines, one translation per line\n\
         - Do not add explanations or any other text\n",
        count = texts.len(),
    );

    if let Some(context) = context {
        prompt.push_str(&format!("- Context: {}\n", context));
    }

    prompt.push('\n');
    for (i, text) in texts.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, text));
    }

    prompt
}
