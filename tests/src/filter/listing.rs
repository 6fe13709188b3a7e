use crate::fixtures::{FETCH_LISTING, init_tracing};
use chaff_core::decoder::{parse_listing, read_listing};
use chaff_core::filter::{Filter, Filters, IgnoreRange, is_kotlin_class};
use chaff_core::insn::{ClassListing, Insn};
use chaff_utils::errors::ParseError;
use std::io::Write;

fn filter_all(class: &ClassListing) -> Vec<Vec<IgnoreRange>> {
    let filters = Filters::all();
    class
        .methods
        .iter()
        .map(|method| {
            let mut ranges = Vec::new();
            filters.filter(method, class, &mut ranges);
            ranges
        })
        .collect()
}

#[test]
fn test_fetch_listing() {
    init_tracing();
    let class = parse_listing(FETCH_LISTING).unwrap();
    assert_eq!(class.name, "demo/FetchKt$main$1");
    assert!(is_kotlin_class(&class));
    assert_eq!(class.methods.len(), 2);
    assert_eq!(class.methods[0].instructions.len(), 65);

    let ranges = filter_all(&class);
    assert_eq!(
        ranges[0],
        vec![
            IgnoreRange::new(57, 63),
            IgnoreRange::new(6, 18),
            IgnoreRange::new(26, 44),
        ]
    );
    assert!(ranges[1].is_empty(), "constructor is not a state machine");

    let body = &class.methods[0].instructions;
    assert!(matches!(body.get(6), Some(Insn::TableSwitch { .. })));
    assert_eq!(body.get(63), Some(&Insn::Simple(chaff_core::Opcode::ATHROW)));
}

#[test]
fn test_read_listing_from_file() {
    init_tracing();
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(FETCH_LISTING.as_bytes()).unwrap();

    let class = read_listing(tmp.path()).unwrap();
    assert_eq!(class, parse_listing(FETCH_LISTING).unwrap());
    assert_eq!(filter_all(&class)[0].len(), 3);
}

#[test]
fn test_printed_listing_parses_back() {
    let class = parse_listing(FETCH_LISTING).unwrap();
    let mut printed = format!("class {}\n", class.name);
    for annotation in &class.annotations {
        printed.push_str(&format!("annotation {annotation}\n"));
    }
    for method in &class.methods {
        printed.push_str(&format!("method {} {}\n", method.name, method.descriptor));
        for insn in &method.instructions {
            printed.push_str(&format!("  {insn}\n"));
        }
        printed.push_str("end\n");
    }
    assert_eq!(parse_listing(&printed).unwrap(), class);
}

#[test]
fn test_edited_listing() {
    let reworded = FETCH_LISTING.replace("with coroutine", "without coroutine");
    let class = parse_listing(&reworded).unwrap();
    assert!(filter_all(&class).iter().all(Vec::is_empty));

    let plain = FETCH_LISTING.replace("annotation Lkotlin/Metadata;\n", "");
    let class = parse_listing(&plain).unwrap();
    assert!(!is_kotlin_class(&class));
    assert!(filter_all(&class).iter().all(Vec::is_empty));
}

#[test]
fn test_malformed_listing() {
    let dangling = FETCH_LISTING.replace("IF_ACMPNE L6", "IF_ACMPNE L42");
    assert!(matches!(
        parse_listing(&dangling),
        Err(ParseError::UndefinedLabel { .. })
    ));

    let unknown = FETCH_LISTING.replace("ASTORE 2", "ASTOR 2");
    assert!(matches!(
        parse_listing(&unknown),
        Err(ParseError::UnknownOpcode { .. })
    ));

    let open = FETCH_LISTING.trim_end().trim_end_matches("end");
    assert!(matches!(
        parse_listing(open),
        Err(ParseError::UnterminatedMethod(_))
    ));

    assert!(matches!(
        read_listing("/nonexistent/FetchKt.listing"),
        Err(ParseError::FileRead { .. })
    ));
}
