//! The analysis and generation pipeline.
//!
//! Analysis runs a fixed sequence per request: detect platform, fetch
//! metadata, extract audio, transcribe, LLM-extract, normalize. The temp
//! audio file is owned by the pipeline and removed on success and on every
//! failure path after extraction.

pub mod parse;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::llm::image::{GeneratedImage, ImageProvider};
use crate::llm::{ChatRequest, LlmProvider};
use crate::platform::{PlatformHandler, PlatformRegistry};
use crate::prompts::extract_recipe::{render_extract_prompt, EXTRACT_TEMPERATURE};
use crate::prompts::generate_recipe::{
    render_generate_prompt, render_image_prompt, GenerationPreferences, GENERATE_TEMPERATURE,
};
use crate::types::{ExtractedRecipe, Language, Platform, VideoMetadata};
use crate::vocab;

/// Result of analyzing a source video.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub platform: Platform,
    pub metadata: Option<VideoMetadata>,
    pub recipe: ExtractedRecipe,
}

/// Result of generating a recipe from preferences.
#[derive(Debug)]
pub struct GenerationOutput {
    pub recipe: ExtractedRecipe,
    /// Dish image; `None` when image generation failed (demoted to warning).
    pub image: Option<GeneratedImage>,
}

pub struct Pipeline {
    registry: PlatformRegistry,
    transcriber: Arc<dyn crate::stt::Transcriber>,
    llm: Arc<dyn LlmProvider>,
    image: Arc<dyn ImageProvider>,
    temp_dir: PathBuf,
}

impl Pipeline {
    pub fn new(
        registry: PlatformRegistry,
        transcriber: Arc<dyn crate::stt::Transcriber>,
        llm: Arc<dyn LlmProvider>,
        image: Arc<dyn ImageProvider>,
        temp_dir: PathBuf,
    ) -> Self {
        Self {
            registry,
            transcriber,
            llm,
            image,
            temp_dir,
        }
    }

    /// Whether any handler recognizes this URL. Lets callers reject
    /// unsupported platforms before any provider is contacted.
    pub fn supports(&self, url: &str) -> bool {
        self.registry.detect(url).is_some()
    }

    /// Run the full analysis sequence for a source video URL.
    pub async fn analyze(
        &self,
        url: &str,
        language: Language,
    ) -> Result<AnalysisOutput, PipelineError> {
        let handler = self
            .registry
            .detect(url)
            .ok_or_else(|| PipelineError::UnsupportedPlatform(url.to_string()))?;

        let metadata = handler.fetch_metadata(url).await;
        let audio = handler.extract_audio(url, &self.temp_dir).await?;
        info!(
            platform = handler.platform().as_str(),
            audio = %audio.display(),
            "audio extracted"
        );

        // Everything after extraction runs behind a cleanup barrier: the
        // audio file is removed on success and on failure alike.
        let result = self
            .extract_from_audio(handler, &audio, metadata.as_ref(), language)
            .await;
        handler.cleanup(&audio).await;
        let recipe = result?;

        Ok(AnalysisOutput {
            platform: handler.platform(),
            metadata,
            recipe,
        })
    }

    async fn extract_from_audio(
        &self,
        handler: &dyn PlatformHandler,
        audio: &Path,
        metadata: Option<&VideoMetadata>,
        language: Language,
    ) -> Result<ExtractedRecipe, PipelineError> {
        let transcript = self.transcriber.transcribe(audio, language).await?;

        let caption = metadata
            .and_then(|m| m.title.as_deref())
            .map(|title| handler.clean_description(title))
            .unwrap_or_default();

        let prompt = render_extract_prompt(&transcript, &caption, language);
        let raw = self
            .llm
            .complete(&ChatRequest::json(prompt, EXTRACT_TEMPERATURE))
            .await?;

        parse::parse_recipe_payload(&raw, language)
    }

    /// Generate a recipe from user preferences, plus one dish image.
    pub async fn generate(
        &self,
        preferences: &GenerationPreferences,
        language: Language,
    ) -> Result<GenerationOutput, PipelineError> {
        // Preferences were validated at ingress, but the pipeline still
        // filters so it never forwards out-of-vocabulary values.
        let filtered = GenerationPreferences {
            meal_type: preferences
                .meal_type
                .clone()
                .filter(|m| vocab::contains(vocab::meal_types(language), m)),
            diet_types: vocab::retain_known(
                vocab::diet_types(language),
                preferences.diet_types.clone(),
            ),
            equipment: vocab::retain_known(
                vocab::equipment(language),
                preferences.equipment.clone(),
            ),
            ingredients: preferences
                .ingredients
                .iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
        };

        let prompt = render_generate_prompt(&filtered, language);
        let raw = self
            .llm
            .complete(&ChatRequest::json(prompt, GENERATE_TEMPERATURE))
            .await?;
        let recipe = parse::parse_recipe_payload(&raw, language)?;

        let image = match self
            .image
            .generate(&render_image_prompt(&recipe.title))
            .await
        {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(title = %recipe.title, error = %e, "dish image generation failed");
                None
            }
        };

        Ok(GenerationOutput { recipe, image })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::llm::image::FakeImageProvider;
    use crate::llm::FakeProvider;
    use crate::stt::FakeTranscriber;

    /// Handler that writes a small file instead of invoking a downloader.
    struct FakePlatform {
        extractions: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PlatformHandler for FakePlatform {
        fn platform(&self) -> Platform {
            Platform::TikTok
        }

        fn matches(&self, url: &str) -> bool {
            url.starts_with("https://fake.test/")
        }

        async fn fetch_metadata(&self, _url: &str) -> Option<VideoMetadata> {
            Some(VideoMetadata {
                title: Some("Garlic   butter pasta #foodtok".to_string()),
                ..Default::default()
            })
        }

        async fn extract_audio(
            &self,
            _url: &str,
            output_dir: &Path,
        ) -> Result<PathBuf, crate::error::DownloadError> {
            tokio::fs::create_dir_all(output_dir).await?;
            let path = output_dir.join(format!("{}.mp3", uuid::Uuid::new_v4()));
            tokio::fs::write(&path, b"fake audio").await?;
            self.extractions.fetch_add(1, Ordering::SeqCst);
            Ok(path)
        }
    }

    fn pipeline_with(llm: FakeProvider, temp_dir: &Path) -> (Pipeline, Arc<AtomicUsize>) {
        let extractions = Arc::new(AtomicUsize::new(0));
        let mut registry = PlatformRegistry::empty();
        registry.register(Box::new(FakePlatform {
            extractions: extractions.clone(),
        }));
        let pipeline = Pipeline::new(
            registry,
            Arc::new(FakeTranscriber::new("melt butter, add garlic, toss pasta")),
            Arc::new(llm),
            Arc::new(FakeImageProvider::new(vec![1, 2, 3])),
            temp_dir.to_path_buf(),
        );
        (pipeline, extractions)
    }

    const RECIPE_JSON: &str = r#"{
        "title": "Garlic butter pasta",
        "prep_time": 5,
        "cook_time": 12,
        "total_time": 17,
        "servings": 2,
        "cuisine_origin": "italian",
        "meal_type": "dinner",
        "diet_type": "vegetarian",
        "equipment": ["stovetop", "time machine"],
        "ingredients": [
            {"name": "pasta", "quantity": 200, "unit": "g"},
            {"name": "butter", "quantity": 50, "unit": "g"}
        ],
        "steps": [
            {"order": 1, "text": "Melt the butter.", "ingredients_used": ["butter"]},
            {"order": 2, "text": "Toss the pasta.", "ingredients_used": ["pasta"]}
        ]
    }"#;

    async fn temp_audio_files(dir: &Path) -> usize {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(e) => e,
            Err(_) => return 0,
        };
        let mut count = 0;
        while let Ok(Some(_)) = entries.next_entry().await {
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn test_analyze_happy_path_normalizes_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let llm = FakeProvider::new();
        llm.push_response(format!("```json\n{RECIPE_JSON}\n```"));
        let (pipeline, extractions) = pipeline_with(llm, dir.path());

        let output = pipeline
            .analyze("https://fake.test/video/1?share=1", Language::En)
            .await
            .unwrap();

        assert_eq!(output.platform, Platform::TikTok);
        assert_eq!(output.recipe.title, "Garlic butter pasta");
        // String diet coerced to a list, equipment filtered to vocabulary.
        assert_eq!(output.recipe.diet_type, vec!["vegetarian"]);
        assert_eq!(output.recipe.equipment, vec!["stovetop"]);
        assert_eq!(extractions.load(Ordering::SeqCst), 1);
        // Temp audio removed on success.
        assert_eq!(temp_audio_files(dir.path()).await, 0);
    }

    #[tokio::test]
    async fn test_analyze_not_recipe_cleans_up_audio() {
        let dir = tempfile::tempdir().unwrap();
        let llm = FakeProvider::new();
        llm.push_response(r#"{"error": "NOT_RECIPE", "message": "Ce lien parle de skateboard."}"#);
        let (pipeline, _) = pipeline_with(llm, dir.path());

        let err = pipeline
            .analyze("https://fake.test/video/2", Language::Fr)
            .await
            .unwrap_err();

        match err {
            PipelineError::NotRecipe { message } => {
                assert_eq!(message, "Ce lien parle de skateboard.")
            }
            other => panic!("expected NotRecipe, got {other:?}"),
        }
        // Temp audio removed on the failure path too.
        assert_eq!(temp_audio_files(dir.path()).await, 0);
    }

    #[tokio::test]
    async fn test_analyze_unsupported_platform_contacts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, extractions) = pipeline_with(FakeProvider::new(), dir.path());

        let err = pipeline
            .analyze("https://vimeo.com/123", Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UnsupportedPlatform(_)));
        assert_eq!(extractions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generate_returns_recipe_and_image() {
        let dir = tempfile::tempdir().unwrap();
        let llm = FakeProvider::new();
        llm.push_response(RECIPE_JSON);
        let (pipeline, _) = pipeline_with(llm, dir.path());

        let preferences = GenerationPreferences {
            meal_type: Some("dinner".to_string()),
            diet_types: vec!["vegetarian".to_string(), "carnivore".to_string()],
            equipment: vec!["stovetop".to_string()],
            ingredients: vec!["pasta".to_string(), "  ".to_string()],
        };

        let output = pipeline
            .generate(&preferences, Language::En)
            .await
            .unwrap();

        assert_eq!(output.recipe.title, "Garlic butter pasta");
        assert!(matches!(
            output.image,
            Some(GeneratedImage::Bytes(ref b)) if b == &vec![1, 2, 3]
        ));
    }
}
