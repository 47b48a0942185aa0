// src/quiz/provider.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::{
    config::Config,
    error::AppError,
    models::question::{AnswerOption, ProviderQuestion, Question},
    utils::html::clean_html,
};

/// Source of quiz questions and the categories they can be filtered by.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    /// Fetches one freshly generated question, optionally restricted to a category.
    async fn fetch_question(&self, category: Option<&str>) -> Result<Question, AppError>;

    /// Lists the category names the provider understands.
    async fn list_categories(&self) -> Result<Vec<String>, AppError>;
}

/// Question provider backed by the generation webhook.
#[derive(Debug, Clone)]
pub struct HttpQuestionProvider {
    client: Client,
    question_url: Url,
    categories_url: Url,
}

impl HttpQuestionProvider {
    pub fn new(question_url: &str, categories_url: &str) -> Result<Self, AppError> {
        let question_url = Url::parse(question_url)
            .map_err(|e| AppError::InternalServerError(format!("Invalid question provider URL: {}", e)))?;
        let categories_url = Url::parse(categories_url)
            .map_err(|e| AppError::InternalServerError(format!("Invalid categories URL: {}", e)))?;

        // Generation can take most of a question's time budget.
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(Self {
            client,
            question_url,
            categories_url,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(&config.question_provider_url, &config.categories_url)
    }

    fn question_url_for(&self, category: Option<&str>) -> Url {
        let mut url = self.question_url.clone();
        if let Some(category) = category {
            url.query_pairs_mut().append_pair("category", category);
        }
        url
    }
}

#[async_trait]
impl QuestionProvider for HttpQuestionProvider {
    async fn fetch_question(&self, category: Option<&str>) -> Result<Question, AppError> {
        let url = self.question_url_for(category);
        tracing::debug!("Fetching question from {}", url);

        let payload: ProviderQuestion = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        into_question(payload)
    }

    async fn list_categories(&self) -> Result<Vec<String>, AppError> {
        let categories: Vec<String> = self
            .client
            .get(self.categories_url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(categories
            .into_iter()
            .map(|c| clean_html(c.trim()))
            .filter(|c| !c.is_empty())
            .collect())
    }
}

/// Sanitizes a webhook payload and checks it is answerable.
pub fn into_question(payload: ProviderQuestion) -> Result<Question, AppError> {
    let text = clean_html(payload.question.trim());
    if text.is_empty() {
        return Err(AppError::Upstream("Provider returned an empty question".to_string()));
    }

    let options: Vec<AnswerOption> = payload
        .answers
        .into_iter()
        .map(|a| AnswerOption {
            content: clean_html(a.content.trim()),
            is_correct: a.is_correct,
        })
        .collect();

    if options.len() < 2 {
        return Err(AppError::Upstream(format!(
            "Provider returned {} answer(s), need at least 2",
            options.len()
        )));
    }
    if !options.iter().any(|o| o.is_correct) {
        return Err(AppError::Upstream(
            "Provider returned a question without a correct answer".to_string(),
        ));
    }

    Ok(Question { text, options })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<Question, AppError> {
        into_question(serde_json::from_str(raw).unwrap())
    }

    #[test]
    fn parses_webhook_payload() {
        let question = parse(
            r#"{
                "question": "2 + 2 = ?",
                "answers": [
                    {"content": "3", "is_Correct": false},
                    {"content": "4", "is_Correct": true}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(question.text, "2 + 2 = ?");
        assert_eq!(question.option_contents(), vec!["3", "4"]);
        assert_eq!(question.correct_answer(), Some("4"));
    }

    #[test]
    fn strips_script_tags_from_generated_text() {
        let question = parse(
            r#"{
                "question": "Pick <script>alert(1)</script>one",
                "answers": [
                    {"content": "<b>a</b>", "is_Correct": true},
                    {"content": "b", "is_Correct": false}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(question.text, "Pick one");
        assert_eq!(question.options[0].content, "a");
    }

    #[test]
    fn keeps_plain_text_characters_verbatim() {
        let question = parse(
            r#"{
                "question": "Is 2 < 3 & 4 > 1?",
                "answers": [
                    {"content": "a < b", "is_Correct": true},
                    {"content": "Tom & Jerry", "is_Correct": false}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(question.text, "Is 2 < 3 & 4 > 1?");
        assert_eq!(question.option_contents(), vec!["a < b", "Tom & Jerry"]);
        assert_eq!(question.correct_answer(), Some("a < b"));
    }

    #[test]
    fn rejects_question_without_correct_answer() {
        let result = parse(
            r#"{"question": "?", "answers": [{"content": "a"}, {"content": "b"}]}"#,
        );
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[test]
    fn rejects_single_option_question() {
        let result = parse(r#"{"question": "?", "answers": [{"content": "a", "is_Correct": true}]}"#);
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[test]
    fn appends_category_query() {
        let provider =
            HttpQuestionProvider::new("http://localhost:5678/webhook/que", "http://localhost:5678/webhook/cat")
                .unwrap();

        assert_eq!(
            provider.question_url_for(Some("World History")).as_str(),
            "http://localhost:5678/webhook/que?category=World+History"
        );
        assert_eq!(
            provider.question_url_for(None).as_str(),
            "http://localhost:5678/webhook/que"
        );
    }
}
