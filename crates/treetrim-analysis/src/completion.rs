use serde::{Deserialize, Serialize};

/// A generated continuation together with the tokens that spell it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub token_logprobs: Vec<f64>,
}

impl Completion {
    /// The first generated line, trimmed, with the tokens that spell it.
    ///
    /// Tokens after the first newline are dropped. The token carrying that
    /// newline keeps only the text before it, or is dropped when nothing but
    /// whitespace precedes the newline.
    pub fn first_line(&self) -> Self {
        let text = self.text.split('\n').next().unwrap_or_default().trim().to_owned();
        let mut tokens = Vec::new();
        let mut token_logprobs = Vec::new();

        for (token, &logprob) in self.tokens.iter().zip(&self.token_logprobs) {
            match token.split_once('\n') {
                None => {
                    tokens.push(token.clone());
                    token_logprobs.push(logprob);
                }
                Some((head, _)) => {
                    if !head.trim().is_empty() {
                        tokens.push(head.to_owned());
                        token_logprobs.push(logprob);
                    }
                    break;
                }
            }
        }

        Self { text, tokens, token_logprobs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(tokens: &[&str]) -> Completion {
        Completion {
            text: tokens.concat(),
            tokens: tokens.iter().map(|&token| token.to_owned()).collect(),
            token_logprobs: (1..=tokens.len()).map(|i| -(i as f64) / 10.0).collect(),
        }
    }

    #[test]
    fn first_line_stops_at_the_newline_token() {
        let line = completion(&[" x", " +", " 1", "\n", "    y"]).first_line();
        assert_eq!(line.text, "x + 1");
        assert_eq!(line.tokens, [" x", " +", " 1"]);
        assert_eq!(line.token_logprobs, [-0.1, -0.2, -0.3]);
    }

    #[test]
    fn newline_inside_a_token_keeps_its_head() {
        let line = completion(&["f(", "a)\n", "g"]).first_line();
        assert_eq!(line.text, "f(a)");
        assert_eq!(line.tokens, ["f(", "a)"]);
        assert_eq!(line.token_logprobs.len(), 2);
    }

    #[test]
    fn single_line_completion_is_unchanged() {
        let original = completion(&["return", " x"]);
        let line = original.first_line();
        assert_eq!(line.tokens, original.tokens);
        assert_eq!(line.text, "return x");
    }

    #[test]
    fn deserializes_without_tokens() {
        let completion: Completion = serde_json::from_str(r#"{"text": "x"}"#).unwrap();
        assert!(completion.tokens.is_empty());
        assert_eq!(completion.first_line().text, "x");
    }
}
