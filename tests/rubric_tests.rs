use std::path::PathBuf;

use rust_xlsxwriter::Workbook;
use trilha::rubric::{RubricError, RubricTable, load_active_challenge};

const HEADER: &str = "Etapa,Semana,Desafio,Critérios,Atual,Directory_Key";

fn table(csv: &str) -> RubricTable {
    RubricTable::from_csv_reader(csv.as_bytes()).expect("parse csv")
}

#[test]
fn single_active_row_is_returned_verbatim() {
    let rubric = table(&format!(
        "{HEADER}\n1,2,Antigo,Velho,,OLD\n1,3,Resumo sobre IA,\"Clareza, exemplos\",x,ABC\n2,1,Próximo,Nada,,NEXT\n"
    ));

    let row = rubric.resolve_active().expect("active row");

    assert_eq!(row.stage(), Some("1"));
    assert_eq!(row.week(), Some("3"));
    assert_eq!(row.challenge(), Some("Resumo sobre IA"));
    assert_eq!(row.criteria(), Some("Clareza, exemplos"));
    assert_eq!(row.folder_id(), Some("ABC"));
    assert_eq!(row.get("Atual"), Some("x"));
    assert_eq!(row.fields().len(), 6);
}

#[test]
fn no_active_row_is_an_error() {
    let rubric = table(&format!("{HEADER}\n1,2,A,B,,OLD\n1,3,C,D,,ABC\n"));

    assert!(matches!(
        rubric.resolve_active(),
        Err(RubricError::NoActiveChallenge)
    ));
}

#[test]
fn marker_match_is_case_sensitive() {
    let rubric = table(&format!("{HEADER}\n1,2,A,B,X,OLD\n"));

    assert!(matches!(
        rubric.resolve_active(),
        Err(RubricError::NoActiveChallenge)
    ));
}

#[test]
fn marker_ignores_surrounding_whitespace() {
    let rubric = table(&format!("{HEADER}\n1,2,A,B, x ,OLD\n"));

    let row = rubric.resolve_active().expect("active row");
    assert_eq!(row.folder_id(), Some("OLD"));
}

#[test]
fn several_active_rows_are_ambiguous() {
    let rubric = table(&format!("{HEADER}\n1,1,A,B,x,F1\n1,2,C,D,,F2\n1,3,E,F,x,F3\n"));

    match rubric.resolve_active() {
        Err(RubricError::AmbiguousActiveChallenge { rows }) => assert_eq!(rows, vec![1, 3]),
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn missing_required_column_is_reported() {
    let rubric = table("Etapa,Semana,Desafio,Atual\n1,3,A,x\n");

    match rubric.resolve_active() {
        Err(RubricError::MissingColumn(column)) => assert_eq!(column, "Critérios"),
        other => panic!("expected missing column, got {other:?}"),
    }
}

#[test]
fn blank_rows_and_short_rows_are_tolerated() {
    let rubric = table(&format!("{HEADER}\n,,,,,\n1,3,A,B,x\n"));

    assert_eq!(rubric.len(), 1);
    let row = rubric.resolve_active().expect("active row");
    assert_eq!(row.folder_id(), None);
    assert_eq!(row.get("Directory_Key"), Some(""));
}

#[test]
fn repeated_header_uses_its_first_column() {
    let rubric = table("Etapa,Semana,Desafio,Critérios,Atual,Directory_Key,Etapa,Atual\n1,3,A,B,x,ABC,9,\n");

    let row = rubric.resolve_active().expect("active row");

    assert_eq!(row.stage(), Some("1"));
    assert_eq!(row.get("Atual"), Some("x"));
    assert_eq!(row.fields().len(), 6);
}

#[test]
fn missing_file_is_an_io_error() {
    let path = PathBuf::from("definitely/not/here/desafios.xlsx");

    assert!(matches!(
        load_active_challenge(&path),
        Err(RubricError::Io { .. })
    ));
}

#[test]
fn workbook_numbers_render_without_decimals() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("trilha_ia_desafios.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, name) in ["Etapa", "Semana", "Desafio", "Critérios", "Atual", "Directory_Key"]
        .into_iter()
        .enumerate()
    {
        sheet.write_string(0, col as u16, name).expect("header");
    }
    sheet.write_number(1, 0, 1.0).expect("stage");
    sheet.write_number(1, 1, 2.0).expect("week");
    sheet.write_string(1, 2, "Antigo").expect("challenge");
    sheet.write_string(1, 3, "Nada").expect("criteria");
    sheet.write_string(1, 5, "OLD").expect("folder");
    sheet.write_number(2, 0, 1.0).expect("stage");
    sheet.write_number(2, 1, 3.0).expect("week");
    sheet.write_string(2, 2, "Resumo").expect("challenge");
    sheet.write_string(2, 3, "Clareza").expect("criteria");
    sheet.write_string(2, 4, "x").expect("active");
    sheet.write_string(2, 5, "ABC").expect("folder");
    workbook.save(&path).expect("save workbook");

    let row = load_active_challenge(&path).expect("active row");

    assert_eq!(row.stage(), Some("1"));
    assert_eq!(row.week(), Some("3"));
    assert_eq!(row.challenge(), Some("Resumo"));
    assert_eq!(row.folder_id(), Some("ABC"));
}
