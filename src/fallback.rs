//! Canned replies used when the completion call fails or is not configured.
//!
//! Every reply is prefixed with a mode tag chosen by failure kind; the body is
//! picked from an ordered rule table matched against the lowercased input.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, instrument};

use crate::completion::CompletionFailure;
use crate::domain::{SuggestionResult, VocabSuggestion};

/// Bracketed label disclosing that a reply was not produced by the model.
pub fn mode_tag(failure: &CompletionFailure) -> &'static str {
  match failure {
    CompletionFailure::Unconfigured | CompletionFailure::Unavailable(_) => "[Demo Mode]",
    CompletionFailure::RateLimited => "[Temporary AI Limit]",
    CompletionFailure::QuotaExceeded => "[AI Service Quota]",
    CompletionFailure::Timeout => "[Connection Timeout]",
  }
}

pub fn tagged(failure: &CompletionFailure, body: &str) -> String {
  format!("{} {}", mode_tag(failure), body)
}

/// One row of a fallback ladder.
pub struct Rule {
  pub name: &'static str,
  pub matches: fn(&str) -> bool,
  pub reply: &'static str,
}

/// First rule whose predicate matches `lower`, else `default`.
fn pick<'a>(rules: &'a [Rule], lower: &str, default: &'a str) -> (&'a str, &'a str) {
  rules
    .iter()
    .find(|r| (r.matches)(lower))
    .map(|r| (r.name, r.reply))
    .unwrap_or(("default", default))
}

const UNAVAILABLE_RULES: &[Rule] = &[
  Rule {
    name: "english_natural",
    matches: |s| s.contains("english") && s.contains("natural"),
    reply: "A better way to say this would be: 'How can I speak English more naturally in a short time? Is talking with AI a better option?' Speaking English naturally comes from practice and exposure! Talking with AI can definitely help because you can practice anytime without feeling embarrassed. What specific situations do you want to feel more confident in when speaking English?",
  },
  Rule {
    name: "pickleball",
    matches: |s| s.contains("pickleball"),
    reply: "A better way to phrase this would be: 'I need to keep practicing pickleball. I want to become a stronger player. Are there any exercises I can follow?' Pickleball is such a fun sport! To get stronger, focus on footwork drills, paddle control exercises, and core strengthening. What specific aspect of your pickleball game would you most like to improve?",
  },
  Rule {
    name: "greeting",
    matches: |s| s.contains("hello") || s.contains("hi"),
    reply: "Hello there! It's so nice to meet you! I'm here to be your English conversation partner and help you practice speaking naturally. What's something interesting that happened to you today, or is there a particular topic you'd like to talk about?",
  },
  Rule {
    name: "help_learn",
    matches: |s| s.contains("help") || s.contains("learn"),
    reply: "I'm absolutely delighted to help you with your English! Learning a language is such an exciting journey, and I'm here to make it fun and natural. We can chat about your hobbies, dreams, daily life, or anything that interests you. What would you like to start talking about today?",
  },
  Rule {
    name: "practice",
    matches: |s| s.contains("practice"),
    reply: "Practice is exactly how fluency grows! Short, regular conversations beat long, rare study sessions. Try describing your day to me in three or four sentences, and I'll help you polish them. What did you do this morning?",
  },
];

const UNAVAILABLE_DEFAULT: &str = "That's really interesting! I love having natural conversations like this because it's exactly how you'll use English in real life. Every time you share something with me, you're building your confidence and fluency. What else would you like to chat about, or is there something specific about English that you're curious about?";

const RATE_LIMIT_RULES: &[Rule] = &[
  Rule {
    name: "english_learn",
    matches: |s| s.contains("english") || s.contains("learn"),
    reply: "I'd love to help you with your English learning! The AI service is currently busy, but I can still chat with you. Practicing with real conversations like this is one of the best ways to improve. What specific area of English would you like to focus on right now?",
  },
  Rule {
    name: "speaking",
    matches: |s| s.contains("speak"),
    reply: "Speaking practice is so important! Even though our AI service is temporarily busy, I can still help you practice. The key to natural speaking is regular conversation and not being afraid to make mistakes. What topics do you enjoy talking about most?",
  },
];

const RATE_LIMIT_DEFAULT: &str = "I'm experiencing high demand right now, but I'm still here to chat! Your message is interesting and I'd love to continue our conversation. What would you like to explore further?";

const QUOTA_REPLY: &str = "I'm temporarily unable to access the full AI service, but I'm still here to help you practice English! Let's keep chatting - what would you like to talk about?";

const TIMEOUT_REPLY: &str = "The AI service is taking longer than usual to respond. While we wait, let's continue our conversation! What interesting things have you been learning lately?";

/// Generic pool used when no API key is configured at all.
pub const DEMO_RESPONSES: &[&str] = &[
  "That's a great question! I'm here to help you learn English. What would you like to practice today?",
  "Excellent! Let's work on improving your English skills. Would you like to focus on grammar, vocabulary, or conversation?",
  "I understand what you're saying. English can be challenging, but with practice, you'll get better! What specific area would you like help with?",
  "Good job on expressing yourself! Remember, making mistakes is part of learning. Keep practicing!",
  "That's an interesting point! In English, we would typically say it in a few different ways. Would you like me to explain the grammar rule behind this?",
];

/// Chat reply for a failed or unconfigured completion call.
#[instrument(level = "debug", skip(message, rng), fields(kind = failure.kind(), message_len = message.len()))]
pub fn chat_reply<R: Rng + ?Sized>(message: &str, failure: &CompletionFailure, rng: &mut R) -> String {
  let lower = message.to_lowercase();
  let (rule, body) = match failure {
    CompletionFailure::Unconfigured => ("demo_pool", DEMO_RESPONSES.choose(rng).copied().unwrap_or(UNAVAILABLE_DEFAULT)),
    CompletionFailure::RateLimited => pick(RATE_LIMIT_RULES, &lower, RATE_LIMIT_DEFAULT),
    CompletionFailure::QuotaExceeded => ("quota", QUOTA_REPLY),
    CompletionFailure::Timeout => ("timeout", TIMEOUT_REPLY),
    CompletionFailure::Unavailable(_) => pick(UNAVAILABLE_RULES, &lower, UNAVAILABLE_DEFAULT),
  };
  debug!(target: "chat", rule, "Fallback chat reply selected");
  tagged(failure, body)
}

/// Canned suggestions for a failed or unconfigured completion call.
pub fn suggestions(text: &str, failure: &CompletionFailure) -> SuggestionResult {
  let (grammar_fix, better, vocab) = match failure {
    CompletionFailure::Unconfigured => (
      "AI service not configured - grammar check unavailable",
      ["Suggestions need a configured AI service.", "Your message was received successfully.", "Keep practicing in the meantime!"],
      VocabSuggestion::new("configure", "to set up for a particular purpose", "The server must be configured before suggestions work."),
    ),
    CompletionFailure::RateLimited => (
      "Rate limit reached - unable to check grammar right now",
      ["The AI service is temporarily busy. Please try again in a moment.", "Your message was received successfully.", "Rate limit will reset shortly."],
      VocabSuggestion::new("patience", "the ability to wait calmly", "Please have patience while the service recovers."),
    ),
    CompletionFailure::QuotaExceeded => (
      "AI service quota exceeded",
      ["The AI analysis service has reached its daily limit.", "Basic conversation mode is still available.", "Suggestions will resume when quota resets."],
      VocabSuggestion::new("quota", "a limited quantity of something", "The daily quota for API calls has been reached."),
    ),
    CompletionFailure::Timeout => (
      "Connection timeout - analysis unavailable",
      ["The AI service is taking longer than usual to respond.", "Your conversation can continue without suggestions.", "Suggestions will work again when connection improves."],
      VocabSuggestion::new("timeout", "when a process takes too long to complete", "The request failed due to a network timeout."),
    ),
    CompletionFailure::Unavailable(_) => {
      let lower = text.to_lowercase();
      if lower.contains("food") || lower.contains("meal") {
        return SuggestionResult {
          grammar_fix: "Grammar help temporarily unavailable".into(),
          better_versions: vec![
            "What foods should I eat for each meal to stay healthy?".into(),
            "Which foods are best for maintaining good health?".into(),
            "What dietary choices help keep the body youthful?".into(),
          ],
          vocabulary: vec![
            VocabSuggestion::new("nutrition", "the process of providing food necessary for health", "Good nutrition is essential for staying healthy."),
            VocabSuggestion::new("balanced", "having different elements in correct proportions", "A balanced diet includes vegetables, proteins, and grains."),
          ],
        };
      }
      (
        "AI suggestions temporarily unavailable",
        ["Your message was understood clearly.", "Continue practicing - you're doing great!", "Suggestions will be available again soon."],
        VocabSuggestion::new("practice", "to do something repeatedly to improve skill", "Regular practice helps improve English fluency."),
      )
    }
  };
  SuggestionResult {
    grammar_fix: grammar_fix.into(),
    better_versions: better.iter().map(|s| s.to_string()).collect(),
    vocabulary: vec![vocab],
  }
}

/// Canned lesson plan for a failed or unconfigured completion call.
pub fn lesson_plan(level: &str, topic: &str, failure: &CompletionFailure) -> String {
  let body = format!(
    "{level} lesson: {topic}\n\
     Objectives: learn five new words about {topic} and use them in full sentences.\n\
     Activities: read a short text about {topic}, underline unknown words, then discuss it with the AI tutor.\n\
     Exercises: write three sentences about {topic} and ask for grammar suggestions on each."
  );
  tagged(failure, &body)
}
