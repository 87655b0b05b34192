/// Placeholder in feedback templates replaced by the answer label
pub const ANSWER_TOKEN: &str = "%ANS%";

/// Fills the answer label into a feedback template. Only the first token is
/// replaced; templates without one pass through unchanged.
pub fn render_feedback(template: &str, answer: &str) -> String {
    template.replacen(ANSWER_TOKEN, answer, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn token_is_replaced_with_answer() {
        assert_eq!(
            render_feedback("Correct! Answer: %ANS%", "cat"),
            "Correct! Answer: cat"
        );
    }

    #[test]
    fn template_without_token_is_verbatim() {
        assert_eq!(render_feedback("Wrong.", "cat"), "Wrong.");
    }

    #[test]
    fn only_first_token_is_replaced() {
        assert_eq!(render_feedback("%ANS% / %ANS%", "dog"), "dog / %ANS%");
    }

    proptest! {
        #[test]
        fn templates_without_token_never_change(template in "[^%]*", answer in ".*") {
            prop_assert_eq!(render_feedback(&template, &answer), template);
        }

        #[test]
        fn rendered_text_contains_answer(prefix in "[a-z ]{0,12}", answer in "[a-z]{1,8}") {
            let template = format!("{prefix}{ANSWER_TOKEN}");
            let out = render_feedback(&template, &answer);
            prop_assert_eq!(out, format!("{prefix}{answer}"));
        }
    }
}
