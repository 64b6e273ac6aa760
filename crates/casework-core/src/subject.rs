//! Case subject selection and prompt construction.
//!
//! A subject is a set of technology tags plus one or two legal-issue tags,
//! drawn uniformly from fixed catalogs. The randomness source is injected so
//! callers (and tests) control the sequence.

use rand_core::RngCore;
use serde::{Deserialize, Serialize};

use crate::{case::CaseKind, gateway::GenerationRequest};

/// Technology tag combinations a case can involve.
pub const KIND_TAGS: [&[&str]; 3] = [&["AI", "Robotics"], &["AI"], &["Robotics"]];

/// Legal issues a case can raise.
pub const LEGAL_ISSUES: &[&str] = &[
  "Product Liability",
  "Employment Law",
  "Contract Law",
  "Consumer Protection",
  "Privacy",
  "Regulatory Compliance",
  "Blockchain Issues",
  "Antitrust",
  "Environmental Law",
  "Health and Safety",
  "Cybersecurity",
  "Data Protection",
  "Corporate Governance",
  "Labor Law",
  "Securities Law",
  "Banking and Finance Law",
  "Insurance Law",
  "Tax Law",
  "Administrative Law",
  "Human Rights Law",
  "Real Estate Law",
  "Immigration Law",
  "Trade Law",
  "Competition Law",
  "Criminal Law",
  "Family Law",
  "Construction Law",
  "Telecommunications Law",
  "Media Law",
  "Entertainment Law",
  "Sports Law",
  "Agricultural Law",
  "Education Law",
  "Energy Law",
  "Transportation Law",
  "Aviation Law",
  "Maritime Law",
  "Municipal Law",
  "Elder Law",
  "Welfare Law",
  "Intellectual Property Law",
  "Litigation",
  "ADR",
  "Estate Planning Law",
  "Admiralty Law",
  "Gaming Law",
  "Social Security Law",
  "Native American Law",
  "Space Law",
];

pub const SYSTEM_INSTRUCTION: &str =
  "You are a legal expert and will generate detailed legal case fact patterns.";

/// What a generated case is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSubject {
  pub tags:   Vec<String>,
  /// One or two issues, drawn with replacement.
  pub issues: Vec<String>,
}

impl CaseSubject {
  /// Draw a subject from the catalogs.
  pub fn draw(rng: &mut impl RngCore) -> Self {
    let tags = KIND_TAGS[pick(rng, KIND_TAGS.len())]
      .iter()
      .map(|t| (*t).to_owned())
      .collect();

    let count = 1 + pick(rng, 2);
    let issues = (0..count)
      .map(|_| LEGAL_ISSUES[pick(rng, LEGAL_ISSUES.len())].to_owned())
      .collect();

    Self { tags, issues }
  }

  /// Build the generation prompt for a case of `kind` about this subject.
  pub fn prompt(&self, kind: CaseKind) -> GenerationRequest {
    let user_prompt = format!(
      "{exercise}\n\
       Generate a fact pattern for a legal case involving {tags}. The legal issues are {issues}.\n\
       Please provide a detailed fact pattern that is approximately 400 words long.\n\
       The facts should be complex and intricate enough to require a detailed legal analysis \
       but do not include any analysis.\n\
       Only provide the facts. The fact pattern should include:\n\
       - The parties involved\n\
       - The context of the dispute\n\
       - Key events leading up to the dispute\n\
       - Any relevant legal principles or precedents that might apply\n\
       \n\
       Format it as a block of text.",
      exercise = exercise_line(kind),
      tags = self.tags.join(" and "),
      issues = self.issues.join(", "),
    );

    GenerationRequest {
      system_instruction: SYSTEM_INSTRUCTION.to_owned(),
      user_prompt,
    }
  }
}

fn exercise_line(kind: CaseKind) -> &'static str {
  match kind {
    CaseKind::Litigate => "The student will argue this case for one of the parties.",
    CaseKind::Judge => "The student will decide this case as a judge.",
    CaseKind::Grade => "The student will grade arguments written about this case.",
    CaseKind::New | CaseKind::Unrecognized => {
      "The student will write a legal analysis of this case."
    }
  }
}

/// Uniform index in `0..len`.
fn pick(rng: &mut impl RngCore, len: usize) -> usize {
  let len = len as u64;
  // Draws at or above the largest multiple of `len` are redrawn.
  let zone = u64::MAX - u64::MAX % len;
  loop {
    let v = rng.next_u64();
    if v < zone {
      return (v % len) as usize;
    }
  }
}
