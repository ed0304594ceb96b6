//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::tokens::JwtService;
use story_tutor_core::ports::{DatabaseService, IdentityVerifier, TextGenerationService};
use story_tutor_core::{GrammarService, StoryService, WordService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub tokens: JwtService,
    pub stories: StoryService,
    pub grammar: GrammarService,
    pub words: WordService,
}

impl AppState {
    /// Wires the content services around a single text generator.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        llm: Arc<dyn TextGenerationService>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let tokens = JwtService::new(
            &config.jwt_secret,
            config.jwt_algorithm,
            config.access_token_expire_minutes,
        );
        Self {
            stories: StoryService::new(llm.clone(), config.story_cache_policy),
            grammar: GrammarService::new(llm.clone()),
            words: WordService::new(
                llm,
                config.words_per_batch,
                config.translation_language.clone(),
            ),
            db,
            config,
            identity,
            tokens,
        }
    }
}
