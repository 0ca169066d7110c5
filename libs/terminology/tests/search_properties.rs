use std::sync::Arc;

use ncez_terminology::{SearchRequest, SortKey, StaticSource, TerminologyService};

const ICD10: &str = r#"[
    {"code": "I10", "display": "Esenciální (primární) hypertenze", "synonyms": ["Vysoký krevní tlak"]},
    {"code": "I11", "display": "Hypertenzní nemoc srdce"},
    {"code": "I15", "display": "Sekundární hypertenze"},
    {"code": "E10", "display": "Diabetes mellitus 1. typu"},
    {"code": "E11", "display": "Diabetes mellitus 2. typu", "synonyms": ["DM2"]},
    {"code": "O24", "display": "Diabetes mellitus v těhotenství"},
    {"code": "J06.9", "display": "Akutní infekce horních dýchacích cest NS"},
    {"code": "A09", "display": "Průjem a gastroenteritida"}
]"#;

fn service() -> TerminologyService {
    let source = StaticSource::default().with_unit("icd10", ICD10);
    let service = TerminologyService::new(Arc::new(source), None, None);
    service.load_all();
    service
}

fn codes(entries: &[ncez_terminology::CodeEntry]) -> Vec<String> {
    let mut codes: Vec<_> = entries.iter().map(|e| e.code.clone()).collect();
    codes.sort();
    codes
}

fn everything(service: &TerminologyService, query: &str) -> Vec<String> {
    let request = SearchRequest::new("icd10")
        .query(query)
        .page(0, usize::MAX);
    codes(&service.search(&request).unwrap())
}

#[test]
fn adding_a_token_never_widens_the_result() {
    let service = service();
    let cases = [
        ("diabetes", "diabetes mellitus"),
        ("diabetes", "diabetes 2."),
        ("hypertenze", "sekundarni hypertenze"),
        ("mellitus", "mellitus tehotenstvi"),
        ("i1", "i1 srdce"),
        ("a", "a prujem"),
    ];

    for (broad, narrow) in cases {
        let wide = everything(&service, broad);
        let tight = everything(&service, narrow);
        assert!(
            tight.iter().all(|c| wide.contains(c)),
            "'{narrow}' returned {tight:?}, not a subset of '{broad}' {wide:?}"
        );
    }
}

#[test]
fn suggestions_are_a_subset_of_search_results() {
    let service = service();
    let queries = ["dia", "hyp", "i1", "e", "DM", "akut", "prujem", "zzz"];

    for query in queries {
        let suggested = codes(&service.suggest("icd10", query, 100, None).unwrap());
        let searched = everything(&service, query);
        assert!(
            suggested.iter().all(|c| searched.contains(c)),
            "suggest('{query}') = {suggested:?} escapes search {searched:?}"
        );
    }
}

#[test]
fn matching_ignores_case_and_diacritics() {
    let service = service();
    let cases = [
        ("PRŮJEM", vec!["A09"]),
        ("prujem", vec!["A09"]),
        ("tehotenstvi", vec!["O24"]),
        ("krevni tlak", vec!["I10"]),
        ("j06.9", vec!["J06.9"]),
    ];

    for (query, expected) in cases {
        assert_eq!(everything(&service, query), expected, "query '{query}'");
    }
}

#[test]
fn exact_code_ranks_first() {
    let service = service();
    let hits = service
        .search(&SearchRequest::new("icd10").query("i10"))
        .unwrap();
    assert_eq!(hits[0].code, "I10");
}

#[test]
fn paging_walks_the_ranked_list() {
    let service = service();
    let full = service
        .search(&SearchRequest::new("icd10").query("diabetes").page(0, usize::MAX))
        .unwrap();
    assert_eq!(full.len(), 3);

    let mut walked = Vec::new();
    for skip in 0..full.len() {
        let page = service
            .search(&SearchRequest::new("icd10").query("diabetes").page(skip, 1))
            .unwrap();
        walked.extend(page);
    }
    assert_eq!(walked, full);

    let past_end = service
        .search(&SearchRequest::new("icd10").query("diabetes").page(10, 5))
        .unwrap();
    assert!(past_end.is_empty());
}

#[test]
fn regex_filters_and_invalid_patterns_error() {
    let service = service();
    let hits = service
        .search(
            &SearchRequest::new("icd10")
                .regex("^E1")
                .sort(SortKey::Code)
                .page(0, usize::MAX),
        )
        .unwrap();
    assert_eq!(codes(&hits), vec!["E10", "E11"]);

    assert!(service
        .search(&SearchRequest::new("icd10").regex("(unclosed"))
        .is_err());
}

#[test]
fn sort_by_display_overrides_relevance() {
    let service = service();
    let hits = service
        .search(
            &SearchRequest::new("icd10")
                .query("hypertenz")
                .sort(SortKey::Display),
        )
        .unwrap();
    let displays: Vec<_> = hits.iter().map(|e| e.display.as_str()).collect();
    assert_eq!(
        displays,
        vec![
            "Esenciální (primární) hypertenze",
            "Hypertenzní nemoc srdce",
            "Sekundární hypertenze",
        ]
    );
}

#[test]
fn all_pseudo_system_spans_loaded_systems() {
    let service = service();
    let hits = service
        .search(&SearchRequest::new("all").query("hypert").page(0, usize::MAX))
        .unwrap();
    assert!(hits.iter().any(|e| e.system == "icd10"));
    // Built-in SNOMED hypertension concept is part of the union.
    assert!(hits.iter().any(|e| e.system == "snomed"));
}
