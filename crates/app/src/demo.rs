//! Built-in content for the `quiz` and `seed` commands.

use learn_core::model::{Difficulty, Question, QuestionId, QuizDefinition};

/// Subject the demo quiz reports progress against.
pub const DEMO_SUBJECT: &str = "Математика";

/// Starting progress written by `seed`, out of 40 lessons per subject.
pub const SEED_PROGRESS: [(&str, u32, u32); 4] = [
    ("Математика", 28, 40),
    ("Физика", 35, 40),
    ("Химия", 22, 40),
    ("Биология", 31, 40),
];

#[must_use]
pub fn algebra_quiz() -> QuizDefinition {
    let questions = vec![
        Question::new(
            QuestionId::new(1),
            "Решите: 2x + 5 = 13",
            options(&["x = 4", "x = 3", "x = 5", "x = 6"]),
            0,
            "Вычтем 5: 2x = 8, разделим на 2: x = 4",
        ),
        Question::new(
            QuestionId::new(2),
            "Что такое производная функции?",
            options(&[
                "Скорость изменения функции",
                "Площадь под графиком",
                "Максимальное значение",
                "Минимальное значение",
            ]),
            0,
            "Производная показывает скорость, с которой функция меняет свое значение",
        ),
        Question::new(
            QuestionId::new(3),
            "Вычисли ∫x² dx",
            options(&["x³/3 + C", "x²/2 + C", "2x + C", "x³ + C"]),
            0,
            "По формуле степенной функции: ∫x² dx = x³/3 + C",
        ),
    ];
    QuizDefinition::new("Математика - Алгебра", Difficulty::Medium, questions)
        .with_subject(DEMO_SUBJECT)
}

fn options(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}
