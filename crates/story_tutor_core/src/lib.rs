pub mod domain;
pub mod grammar;
pub mod parsing;
pub mod ports;
pub mod prompts;
pub mod stories;
pub mod words;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use domain::{
    Credential, DailyWord, GoogleIdentity, GrammarHint, GrammarNote, Level, NewStory, NewUser,
    NewWord, Story, StoryFilter, User, UserCredentials, WordOwner,
};
pub use grammar::GrammarService;
pub use parsing::ParseError;
pub use ports::{
    DatabaseService, IdentityVerifier, PortError, PortResult, TextGenerationService,
};
pub use stories::{StoryCachePolicy, StoryOutcome, StoryService};
pub use words::WordService;
