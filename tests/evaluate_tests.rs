use trilha::{
    evaluate::{
        EvaluationError, Evaluator, parse_assessment,
        prompt::{build_prompt, truncate_chars},
    },
    rubric::RubricRow,
    types::{Submission, Verdict},
};

use pipeline_support::{ScriptedService, reply, rubric_row};

#[test]
fn parses_plain_json_reply() {
    let assessment = parse_assessment(&reply("12345", "Ana Souza", "Bom")).expect("parse");

    assert_eq!(assessment.registration_id.as_deref(), Some("12345"));
    assert_eq!(assessment.student_name.as_deref(), Some("Ana Souza"));
    assert_eq!(assessment.verdict, Verdict::Bom);
}

#[test]
fn tolerates_code_fences_uppercase_keys_and_numeric_ra() {
    let raw = "```json\n{\"RA\": 998877, \"ALUNO\": \"Bia\", \"RESULTADO\": \"ruim\"}\n```";

    let assessment = parse_assessment(raw).expect("parse");

    assert_eq!(assessment.registration_id.as_deref(), Some("998877"));
    assert_eq!(assessment.student_name.as_deref(), Some("Bia"));
    assert_eq!(assessment.verdict, Verdict::Ruim);
}

#[test]
fn blank_identity_fields_become_none() {
    let assessment = parse_assessment(&reply("", "  ", "Regular")).expect("parse");

    assert_eq!(assessment.registration_id, None);
    assert_eq!(assessment.student_name, None);
    assert_eq!(assessment.verdict, Verdict::Regular);
}

#[test]
fn missing_key_is_malformed() {
    let err = parse_assessment(r#"{"ra": "1", "resultado": "Bom"}"#).expect_err("must fail");

    match err {
        EvaluationError::Malformed { reason, .. } => assert!(reason.contains("aluno")),
        other => panic!("expected malformed, got {other:?}"),
    }
}

#[test]
fn unknown_label_is_malformed() {
    let err = parse_assessment(&reply("1", "Caio", "Ótimo")).expect_err("must fail");
    assert!(matches!(err, EvaluationError::Malformed { .. }));
}

#[test]
fn prose_reply_is_malformed() {
    let err = parse_assessment("RA: 1, ALUNO: Caio, RESULTADO: Bom").expect_err("must fail");
    assert!(matches!(err, EvaluationError::Malformed { .. }));
}

#[test]
fn prompt_embeds_rubric_and_submission() {
    let prompt = build_prompt("RA: 777\nNome: Davi\nMeu trabalho", &rubric_row(), 10_000);

    assert!(prompt.contains("Etapa: 1"));
    assert!(prompt.contains("Semana: 3"));
    assert!(prompt.contains("Desafio: Escreva um resumo sobre redes neurais"));
    assert!(prompt.contains("Clareza, exemplos, referências"));
    assert!(prompt.contains("Meu trabalho"));
    assert!(prompt.contains("Bom, Regular, Ruim"));
    assert!(prompt.contains(r#""resultado""#));
}

#[test]
fn prompt_uses_placeholder_for_missing_fields() {
    let rubric = RubricRow::from_fields([("Etapa", "2"), ("Atual", "x")]);

    let prompt = build_prompt("texto", &rubric, 10_000);

    assert!(prompt.contains("Etapa: 2"));
    assert!(prompt.contains("Semana: N/A"));
    assert!(prompt.contains("Desafio: N/A"));
}

#[test]
fn truncation_respects_char_boundaries() {
    assert_eq!(truncate_chars("avaliação", 7), "avaliaç");
    assert_eq!(truncate_chars("curto", 50), "curto");
}

#[tokio::test]
async fn successful_reply_is_assessed() {
    let evaluator = Evaluator::new(ScriptedService::new([Ok(reply("1", "Ana", "Bom"))]));
    let submission = Submission::new("ana.pdf", "RA: 1\nNome: Ana");

    let evaluation = evaluator.evaluate(&submission, &rubric_row()).await;

    assert!(!evaluation.is_fallback());
    assert_eq!(evaluation.verdict(), Verdict::Bom);
    assert_eq!(evaluation.registration_id(), Some("1"));
    assert_eq!(evaluator.service().calls(), 1);
}

#[tokio::test]
async fn every_failure_kind_falls_back_to_regular() {
    let failures = [
        Err(EvaluationError::Transport("timed out".to_string())),
        Err(EvaluationError::Service("insufficient_quota".to_string())),
        Err(EvaluationError::EmptyResponse),
        Ok("não sei".to_string()),
    ];
    let evaluator = Evaluator::new(ScriptedService::new(failures));
    let submission = Submission::new("x.pdf", "texto");

    let mut kinds = Vec::new();
    for _ in 0..4 {
        let evaluation = evaluator.evaluate(&submission, &rubric_row()).await;
        assert_eq!(evaluation.verdict(), Verdict::FALLBACK);
        assert_eq!(evaluation.registration_id(), None);
        match evaluation {
            trilha::evaluate::Evaluation::Fallback(err) => kinds.push(err),
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    assert!(matches!(kinds[0], EvaluationError::Transport(_)));
    assert!(matches!(kinds[1], EvaluationError::Service(_)));
    assert!(matches!(kinds[2], EvaluationError::EmptyResponse));
    assert!(matches!(kinds[3], EvaluationError::Malformed { .. }));
}

#[tokio::test]
async fn prompt_budget_limits_submission_text() {
    let evaluator =
        Evaluator::new(ScriptedService::new([Ok(reply("1", "Ana", "Bom"))])).with_prompt_budget(4);
    let submission = Submission::new("ana.pdf", "ABCDEFGHIJ");

    evaluator.evaluate(&submission, &rubric_row()).await;

    let prompts = evaluator.service().prompts.lock().unwrap();
    assert!(prompts[0].contains("ABCD"));
    assert!(!prompts[0].contains("ABCDE"));
}

#[test]
fn verdict_parsing_is_lenient_on_case_and_punctuation() {
    assert_eq!("bom".parse::<Verdict>(), Ok(Verdict::Bom));
    assert_eq!(" \"REGULAR\". ".parse::<Verdict>(), Ok(Verdict::Regular));
    assert!("Excelente".parse::<Verdict>().is_err());
}

#[test]
fn student_id_comes_from_the_file_stem() {
    assert_eq!(Submission::new("maria_joana.pdf", "").student_id, "maria_joana");
    assert_eq!(Submission::new("sem_extensao", "").student_id, "sem_extensao");
}
