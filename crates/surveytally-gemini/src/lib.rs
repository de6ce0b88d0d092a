use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

use surveytally_core::labels::{CATEGORIES, LABELS};
use surveytally_core::{AnalyzeError, Analyzer, PageAnalysis, PageImage, SurveyItem};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const PROMPT: &str = r#"
You are an expert OCR and data extraction assistant for Korean education satisfaction surveys.
Analyze the provided image of a handwritten survey.

Task:
1. **Extract the Main Title**: Identify the specific name of the education/training program (교육명) usually found at the very top of the page in large text (e.g., "2024년 신입사원 연수", "리더십 강화 과정", "직무 교육 만족도 조사").
2. **Identify Questions**: Find the list of questions (rows).
3. **Categorize**: For each question, categorize it into:
   - '교육기획평가' (Planning)
   - '교육환경평가' (Environment)
   - '강사평가' (Instructor)
   - '프로그램 성과평가' (Outcome)
   - '기타' (Other)
4. **Extract Score**: Identify which satisfaction column is marked (check/circle).
   - '매우만족' (5), '만족' (4), '보통' (3), '불만' (2), '매우불만' (1).

Return the data in JSON format containing the 'title' and the list of 'items'.
If the title is not clearly visible, return an empty string for title.
If no marks are found, return an empty items array.
"#;

/// Gemini `generateContent` implementation of [`Analyzer`].
///
/// One request per page image, structured-JSON output enforced through a
/// response schema. The label and category enums constrain the model, but
/// whatever comes back is carried as plain strings; the aggregation side is
/// deliberately tolerant of out-of-vocabulary values.
pub struct GeminiAnalyzer {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiAnalyzer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn request_body(image: &PageImage) -> Value {
        json!({
            "contents": [{
                "parts": [
                    {
                        "inline_data": {
                            "mime_type": image.mime_type,
                            "data": BASE64.encode(&image.data),
                        }
                    },
                    { "text": PROMPT },
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "title": {
                            "type": "STRING",
                            "description": "The name of the education or survey title found at the top."
                        },
                        "items": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "question": {
                                        "type": "STRING",
                                        "description": "The text of the survey question"
                                    },
                                    "category": {
                                        "type": "STRING",
                                        "enum": CATEGORIES,
                                        "description": "The category of the question"
                                    },
                                    "score": {
                                        "type": "NUMBER",
                                        "description": "Score from 5 (Very Satisfied) to 1 (Very Dissatisfied)"
                                    },
                                    "label": {
                                        "type": "STRING",
                                        "enum": LABELS,
                                        "description": "The label corresponding to the score"
                                    }
                                },
                                "required": ["question", "category", "score", "label"]
                            }
                        }
                    },
                    "required": ["items"]
                }
            }
        })
    }
}

impl Analyzer for GeminiAnalyzer {
    fn analyze<'a>(
        &'a self,
        image: &'a PageImage,
    ) -> Pin<Box<dyn Future<Output = Result<PageAnalysis, AnalyzeError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/{}:generateContent", API_BASE, self.model);

            let resp = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .timeout(REQUEST_TIMEOUT)
                .json(&Self::request_body(image))
                .send()
                .await
                .map_err(|e| AnalyzeError::Request(e.to_string()))?;

            let status = resp.status();
            if status.as_u16() == 429 {
                return Err(AnalyzeError::Request("Rate limited (429)".into()));
            }
            if !status.is_success() {
                return Err(AnalyzeError::Request(format!("HTTP {}", status)));
            }

            let body: Value = resp
                .json()
                .await
                .map_err(|e| AnalyzeError::InvalidResponse(e.to_string()))?;
            tracing::trace!(model = %self.model, "analysis response received");
            parse_response(&body)
        })
    }
}

/// Extract the structured analysis from a `generateContent` response body.
/// An empty candidate text means "nothing legible on this page", not an error.
pub fn parse_response(body: &Value) -> Result<PageAnalysis, AnalyzeError> {
    let text = body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .unwrap_or("");
    if text.is_empty() {
        return Ok(PageAnalysis::default());
    }
    parse_analysis(text)
}

/// Parse the model's JSON payload (`{title, items[]}`) into a [`PageAnalysis`].
pub fn parse_analysis(text: &str) -> Result<PageAnalysis, AnalyzeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| AnalyzeError::InvalidResponse(e.to_string()))?;

    let title = value["title"]
        .as_str()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);

    let items = value["items"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|item| SurveyItem {
                    question: item["question"].as_str().unwrap_or("").to_string(),
                    // The schema says NUMBER; the model sometimes returns 4.0.
                    score: item["score"].as_f64().unwrap_or(0.0).round() as u32,
                    label: item["label"].as_str().unwrap_or("").to_string(),
                    category: item["category"].as_str().unwrap_or("").to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(PageAnalysis { title, items })
}
