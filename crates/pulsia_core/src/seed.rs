//! Demo candidates for seeding a local store.

use crate::model::candidate::{
    CandidateRecord, CandidateStatus, ChatMessage, RadarPoint, Sender,
};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

struct DemoCandidate {
    name: &'static str,
    phone: &'static str,
    status: CandidateStatus,
    score: i64,
    role: &'static str,
    minutes_ago: i64,
    turns: &'static [(Sender, &'static str, &'static str)],
    radar: [f64; 4],
    insights: [&'static str; 4],
}

const RADAR_TRAITS: [&str; 4] = ["Risk Taking", "Mental Calm", "Physical", "Financial"];

const DEMO: &[DemoCandidate] = &[
    DemoCandidate {
        name: "Elena Vasquez",
        phone: "+34 612 345 678",
        status: CandidateStatus::Qualifying,
        score: 87,
        role: "CEO, Deep Sea Ventures",
        minutes_ago: 3,
        turns: &[
            (Sender::Candidate, "14:02", "I've been diving to 40m recreationally for 5 years. I want to push beyond that."),
            (Sender::Agent, "14:03", "That's impressive depth experience. What draws you to extreme depth expeditions?"),
            (Sender::Candidate, "14:05", "The silence. Below 30m the world disappears."),
        ],
        radar: [82.0, 94.0, 78.0, 95.0],
        insights: ["High composure", "Detail-oriented", "Safety-focused", "Leadership traits"],
    },
    DemoCandidate {
        name: "Marc Durand",
        phone: "+33 6 98 76 54 32",
        status: CandidateStatus::New,
        score: 72,
        role: "Free Diver, AIDA Instructor",
        minutes_ago: 12,
        turns: &[
            (Sender::Candidate, "13:45", "I hold a national record in free diving."),
            (Sender::Agent, "13:47", "What's your deepest no-limit dive?"),
            (Sender::Candidate, "13:49", "127m on a single breath."),
        ],
        radar: [95.0, 88.0, 96.0, 55.0],
        insights: ["Extreme athlete", "Fear threshold: very high", "Financial concern flagged", "Seeking validation"],
    },
    DemoCandidate {
        name: "Yuki Tanaka",
        phone: "+81 90 1234 5678",
        status: CandidateStatus::Approved,
        score: 94,
        role: "Aerospace Engineer, JAXA",
        minutes_ago: 60,
        turns: &[
            (Sender::Agent, "12:00", "Your application has been flagged as exceptional. Welcome to the final stage."),
            (Sender::Candidate, "12:05", "I've been training in isolation chambers for 6 months for this."),
        ],
        radar: [75.0, 98.0, 82.0, 88.0],
        insights: ["Exceptional composure", "Analytical mindset", "Isolation trained", "Mission-driven"],
    },
    DemoCandidate {
        name: "Anika Osei",
        phone: "+233 24 567 8901",
        status: CandidateStatus::Qualifying,
        score: 68,
        role: "Wildlife Photographer",
        minutes_ago: 120,
        turns: &[
            (Sender::Candidate, "10:30", "I photograph apex predators in their territory."),
            (Sender::Agent, "10:32", "How do you manage fear in close encounters?"),
            (Sender::Candidate, "10:34", "Fear is a signal, not a stop sign."),
        ],
        radar: [90.0, 72.0, 70.0, 60.0],
        insights: ["Fear of heights", "Strong visual-spatial", "Adrenaline-seeking", "Moderate financial readiness"],
    },
    DemoCandidate {
        name: "Viktor Drăgan",
        phone: "+40 721 234 567",
        status: CandidateStatus::New,
        score: 45,
        role: "Investment Banker",
        minutes_ago: 300,
        turns: &[
            (Sender::Candidate, "08:15", "I want to do something that actually matters."),
            (Sender::Agent, "08:18", "What draws you to extreme expeditions?"),
        ],
        radar: [40.0, 55.0, 35.0, 99.0],
        insights: ["Seeking clarity", "Low physical readiness", "High financial capacity", "Identity crisis indicator"],
    },
];

/// Five screening candidates, most recent first, relative to `now`.
///
/// Ids are fresh v4 UUIDs; avatars are left unset so labels derive from names.
pub fn demo_candidates(now: DateTime<Utc>) -> Vec<CandidateRecord> {
    DEMO.iter()
        .map(|demo| {
            let mut record = CandidateRecord::new(
                Uuid::new_v4().to_string(),
                demo.name,
                demo.status,
                now - Duration::minutes(demo.minutes_ago),
            );
            record.phone = demo.phone.to_string();
            record.diagnostic_score = demo.score;
            record.role = demo.role.to_string();
            record.conversation_history = demo
                .turns
                .iter()
                .enumerate()
                .map(|(index, (sender, timestamp, text))| ChatMessage {
                    id: (index + 1).to_string(),
                    sender: *sender,
                    text: (*text).to_string(),
                    timestamp: (*timestamp).to_string(),
                })
                .collect();
            record.radar_data = RADAR_TRAITS
                .iter()
                .zip(demo.radar)
                .map(|(trait_name, value)| RadarPoint {
                    trait_name: (*trait_name).to_string(),
                    value,
                    full_mark: 100.0,
                })
                .collect();
            record.ai_insights = demo.insights.iter().map(|tag| (*tag).to_string()).collect();
            record
        })
        .collect()
}
