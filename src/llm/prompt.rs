//! Prompt construction for the generation step.

use std::fmt::Write;

use super::chat::ChatPrompt;
use crate::models::Part;

pub const SYSTEM_PROMPT: &str = "You are an assistant for identifying technical credit. \
Use the following pieces of retrieved context to answer the question. If you don't know \
the answer, just say that you don't know. Please only use the provided technical credit \
categories. For each code snippet, keep your answer as concise as possible, while \
identifying as many technical credits as possible.";

/// Render one block per part: the tech credit labels, the example code
/// they came from, and the user's snippet.
pub fn render_parts(parts: &[Part]) -> String {
    let mut out = String::new();
    for part in parts {
        let _ = write!(
            out,
            "Here is the No. {} part of a tech credit\n\
             Description:\n\
             {}\n\n\
             Example code for that tech credit:\n\
             {}\n\n\
             Here is the code from user:\n\
             {}\n",
            part.ordinal, part.tech_credit, part.context_code, part.user_code
        );
    }
    out
}

/// Inputs to the user message.
pub struct PromptInputs<'a> {
    pub tech_credit_list: &'a [String],
    pub context_doc: &'a str,
    pub rendered: &'a str,
    pub question: &'a str,
}

pub fn build_user_prompt(inputs: &PromptInputs<'_>) -> String {
    let categories = inputs
        .tech_credit_list
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "The list of technical credit categories you must follow:\n\
         {categories}\n\n\
         Some documentation about tech credit:\n\
         {}\n\n\
         The following are snippets of codes that are most similar to example codes of tech credits.\n\
         {}\n\
         Question: {}\n\
         Answer:\n",
        inputs.context_doc, inputs.rendered, inputs.question
    )
}

pub fn build_chat_prompt(inputs: &PromptInputs<'_>) -> ChatPrompt {
    ChatPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user: build_user_prompt(inputs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(ordinal: usize) -> Part {
        Part {
            ordinal,
            tech_credit: "Builder: fluent construction".into(),
            user_code: format!("class User{ordinal} {{}}"),
            context_code: "class Example {}".into(),
        }
    }

    #[test]
    fn test_render_parts() {
        let rendered = render_parts(&[part(1), part(2)]);
        assert_eq!(
            rendered,
            "Here is the No. 1 part of a tech credit\n\
             Description:\n\
             Builder: fluent construction\n\n\
             Example code for that tech credit:\n\
             class Example {}\n\n\
             Here is the code from user:\n\
             class User1 {}\n\
             Here is the No. 2 part of a tech credit\n\
             Description:\n\
             Builder: fluent construction\n\n\
             Example code for that tech credit:\n\
             class Example {}\n\n\
             Here is the code from user:\n\
             class User2 {}\n"
        );
    }

    #[test]
    fn test_render_no_parts() {
        assert_eq!(render_parts(&[]), "");
    }

    #[test]
    fn test_user_prompt_sections() {
        let categories = vec!["Builder".to_string(), "Caching".to_string()];
        let inputs = PromptInputs {
            tech_credit_list: &categories,
            context_doc: "Technical credit is ...",
            rendered: "PARTS\n",
            question: "Which credits?",
        };
        let prompt = build_chat_prompt(&inputs);
        assert_eq!(prompt.system, SYSTEM_PROMPT);
        assert!(prompt.user.starts_with(
            "The list of technical credit categories you must follow:\n- Builder\n- Caching\n\n"
        ));
        assert!(prompt.user.contains("Some documentation about tech credit:\nTechnical credit is ...\n\n"));
        assert!(prompt.user.contains("tech credits.\nPARTS\n"));
        assert!(prompt.user.ends_with("Question: Which credits?\nAnswer:\n"));
    }
}
