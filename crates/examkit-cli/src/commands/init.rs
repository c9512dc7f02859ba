//! The `examkit init` command.

use std::path::Path;

use anyhow::Result;

use examkit_core::config::STARTER_CONFIG;

pub fn execute() -> Result<()> {
    if Path::new("examkit.toml").exists() {
        println!("examkit.toml already exists, skipping.");
    } else {
        std::fs::write("examkit.toml", STARTER_CONFIG)?;
        println!("Created examkit.toml");
    }

    std::fs::create_dir_all("pools")?;
    let example_path = Path::new("pools/example.json");
    if example_path.exists() {
        println!("pools/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_POOL)?;
        println!("Created pools/example.json");
    }

    println!("\nNext steps:");
    println!("  1. Add your own questions under pools/");
    println!("  2. Run: examkit validate --pool pools/example.json");
    println!("  3. Run: examkit take --pool pools/example.json --count 10 --minutes 15");

    Ok(())
}

const EXAMPLE_POOL: &str = r#"{
  "title": "Example pool",
  "questions": [
    {"id": "nb-1", "content": "2 + 3 = ?", "difficulty": "NB",
     "options": ["A. 4", "B. 5", "C. 6", "D. 7"], "correctAnswer": "B"},
    {"id": "nb-2", "content": "Which number is even?", "difficulty": "NB",
     "options": ["A. 3", "B. 7", "C. 8", "D. 9"], "correctAnswer": "C"},
    {"id": "nb-3", "content": "What is 10 / 2?", "difficulty": "Nhận biết",
     "options": [{"id": "A", "content": "2"}, {"id": "B", "content": "5"}],
     "correctOptionId": 1},
    {"id": "nb-4", "content": "What is 3 × 3?", "difficulty": "NB",
     "options": ["A. 6", "B. 9", "C. 12"], "correctAnswer": "b."},
    {"id": "nb-5", "content": "What is 1 + 1?", "difficulty": "NB",
     "options": ["A. 2", "B. 3"], "correctAnswer": "A"},
    {"id": "th-1", "content": "Which fraction equals 0.5?", "difficulty": "TH",
     "options": ["A. 1/3", "B. 1/2", "C. 2/3"], "correctAnswer": "B",
     "explanation": "1 divided by 2 is 0.5."},
    {"id": "th-2", "content": "Simplify 4/8.", "difficulty": "Thông hiểu",
     "options": ["A. 1/2", "B. 2/3", "C. 1/4"], "correctAnswer": "A"},
    {"id": "th-3", "content": "Why is 7 prime?", "type": "Essay", "difficulty": "TH"},
    {"id": "vd-1", "content": "A train travels 120 km in 2 hours. Its speed?", "difficulty": "VD",
     "options": ["A. 40 km/h", "B. 60 km/h", "C. 80 km/h"], "correctAnswer": "B",
     "solution": "Speed = distance / time = 120 / 2."},
    {"id": "vdc-1", "content": "Find x if 2x + 3 = 11.", "difficulty": "VDC",
     "options": ["A. 3", "B. 4", "C. 5"], "correctAnswer": "B"}
  ]
}
"#;
