//! Result feedback: a percentage maps to a tier, and each tier offers a few
//! captions and meme images to pick from at random.

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use crate::util::fill_template;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackTier {
  Excellent,
  Good,
  Average,
  NeedsWork,
}

impl FeedbackTier {
  /// First matching threshold wins, highest first.
  pub fn for_percentage(percentage: u32) -> Self {
    match percentage {
      p if p >= 90 => FeedbackTier::Excellent,
      p if p >= 70 => FeedbackTier::Good,
      p if p >= 50 => FeedbackTier::Average,
      _ => FeedbackTier::NeedsWork,
    }
  }

  fn captions(self) -> &'static [&'static str] {
    match self {
      FeedbackTier::Excellent => &[
        "You scored {score}%! The AI thinks you might be the next Einstein.",
        "A perfect score of {score}%! Are you secretly a supercomputer?",
        "{score}%! You're on fire! 🔥",
        "Wow, {score}%! You've officially mastered this topic.",
      ],
      FeedbackTier::Good => &[
        "{score}% is a great score! Keep it up!",
        "Nice work! You got {score}% correct.",
        "You're doing great with {score}%! Almost at the top!",
        "A solid {score}%! You really know your stuff.",
      ],
      FeedbackTier::Average => &[
        "You got {score}%. Not bad, but there's room to improve!",
        "{score}%... A valiant effort! Let's try again.",
        "You're halfway there with {score}%! Keep practicing.",
        "An average score of {score}%. You've got this, let's aim higher next time!",
      ],
      FeedbackTier::NeedsWork => &[
        "Oof, {score}%. Don't worry, practice makes perfect!",
        "Well, that's a start! You scored {score}%.",
        "It's fine, I'm fine, everything is fine. You scored {score}%.",
        "Don't give up! You got {score}%. Let's review and try again.",
      ],
    }
  }

  fn memes(self) -> &'static [&'static str] {
    match self {
      FeedbackTier::Excellent => &["/memes/excellent_1.jpg", "/memes/excellent_2.jpg", "/memes/excellent_3.jpg"],
      FeedbackTier::Good => &["/memes/good_1.png", "/memes/good_2.jpg", "/memes/good_3.png"],
      FeedbackTier::Average => &["/memes/average_1.jpg", "/memes/average_2.gif", "/memes/average_3.jpg"],
      FeedbackTier::NeedsWork => &["/memes/needsWork_1.jpeg", "/memes/needsWork_2.jpg", "/memes/needsWork_3.jpg"],
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Feedback {
  pub tier: FeedbackTier,
  pub caption: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub meme: Option<String>,
}

/// Pick a caption and meme for `percentage`. Deterministic for a seeded `rng`.
pub fn feedback_for_score<R: Rng + ?Sized>(percentage: u32, rng: &mut R) -> Feedback {
  let tier = FeedbackTier::for_percentage(percentage);
  let score = percentage.to_string();
  let caption = tier
    .captions()
    .choose(rng)
    .map(|tpl| fill_template(tpl, &[("score", &score)]))
    .unwrap_or_else(|| format!("You scored {score}%."));
  let meme = tier.memes().choose(rng).map(|m| m.to_string());
  Feedback { tier, caption, meme }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{rngs::StdRng, SeedableRng};

  #[test]
  fn tier_boundaries() {
    assert_eq!(FeedbackTier::for_percentage(100), FeedbackTier::Excellent);
    assert_eq!(FeedbackTier::for_percentage(95), FeedbackTier::Excellent);
    assert_eq!(FeedbackTier::for_percentage(90), FeedbackTier::Excellent);
    assert_eq!(FeedbackTier::for_percentage(89), FeedbackTier::Good);
    assert_eq!(FeedbackTier::for_percentage(70), FeedbackTier::Good);
    assert_eq!(FeedbackTier::for_percentage(50), FeedbackTier::Average);
    assert_eq!(FeedbackTier::for_percentage(49), FeedbackTier::NeedsWork);
    assert_eq!(FeedbackTier::for_percentage(0), FeedbackTier::NeedsWork);
  }

  #[test]
  fn caption_embeds_percentage_and_meme_matches_tier() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..20 {
      let fb = feedback_for_score(73, &mut rng);
      assert_eq!(fb.tier, FeedbackTier::Good);
      assert!(fb.caption.contains("73%"), "caption: {}", fb.caption);
      assert!(!fb.caption.contains("{score}"));
      assert!(fb.meme.as_deref().is_some_and(|m| m.starts_with("/memes/good_")));
    }
  }

  #[test]
  fn excellent_captions_keep_their_wording() {
    let captions = FeedbackTier::Excellent.captions();
    assert_eq!(captions.len(), 4);
    assert!(captions.contains(&"A perfect score of {score}%! Are you secretly a supercomputer?"));
    assert!(captions.contains(&"{score}%! You're on fire! 🔥"));
  }

  #[test]
  fn seeded_rng_is_reproducible() {
    let a = feedback_for_score(42, &mut StdRng::seed_from_u64(5));
    let b = feedback_for_score(42, &mut StdRng::seed_from_u64(5));
    assert_eq!(a, b);
  }

  #[test]
  fn tier_serializes_camel_case() {
    let json = serde_json::to_string(&FeedbackTier::NeedsWork).unwrap();
    assert_eq!(json, "\"needsWork\"");
  }
}
