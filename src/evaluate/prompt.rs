#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use itertools::Itertools;

use crate::{rubric::RubricRow, types::Verdict};

/// Placeholder for rubric fields that are missing or blank.
const NOT_AVAILABLE: &str = "N/A";

/// Cuts `text` to at most `budget` characters, on a char boundary.
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Builds the grading instruction for one submission.
///
/// The model is asked for a JSON object with `ra`, `aluno` and `resultado`,
/// where `resultado` is one of the three verdict labels.
pub fn build_prompt(submission_text: &str, rubric: &RubricRow, budget: usize) -> String {
    let labels = Verdict::ALL.iter().map(Verdict::as_str).join(", ");
    let text = truncate_chars(submission_text.trim(), budget);

    format!(
        r#"Você é um avaliador de trabalhos. Com base no desafio a seguir, avalie o trabalho de um aluno.

Etapa: {stage}
Semana: {week}
Desafio: {challenge}

Critérios:
{criteria}

Trabalho:
{text}

Avalie apenas com uma das palavras: {labels}.
Extraia o número do RA e o nome do aluno da seguinte estrutura encontrada no trabalho:

RA do Aluno/RA: 99999
Nome/ALUNO: xxxxxxxxxxxxxxxxxxxxxxxxxx

Responda somente com um objeto JSON, sem texto adicional, no formato:
{{"ra": "99999", "aluno": "Nome do Aluno", "resultado": "Bom"}}
Use uma string vazia quando o RA ou o nome não forem encontrados."#,
        stage = rubric.stage().unwrap_or(NOT_AVAILABLE),
        week = rubric.week().unwrap_or(NOT_AVAILABLE),
        challenge = rubric.challenge().unwrap_or(NOT_AVAILABLE),
        criteria = rubric.criteria().unwrap_or(NOT_AVAILABLE),
    )
}
