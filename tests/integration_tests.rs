//! # Integration Tests
//!
//! End-to-end flows against the in-memory record store: importing an
//! article export and reviewing a scanned receipt.

use std::io::Write;

use anyhow::Result;
use backoffice_resolver::article_linker::{LinkDecision, MatchStrategy, UnlinkReason};
use backoffice_resolver::config::MatchingConfig;
use backoffice_resolver::duplicate_guard::{ConflictingRecord, MatchedOn, SupplierRef};
use backoffice_resolver::errors::EngineError;
use backoffice_resolver::import::{ImportDefaults, ImportRow, ImportSession, RejectReason};
use backoffice_resolver::model::{CanonicalArticle, CanonicalSupplier, ScannedLineItem, ScannedReceipt};
use backoffice_resolver::receipt_review::{ReceiptReview, ReviewState};
use backoffice_resolver::store::{CatalogSnapshot, InMemoryStore, RecordStore};
use backoffice_resolver::supplier_resolver::SupplierResolution;
use backoffice_resolver::synonyms::{FieldPriority, SynonymDictionary, TargetField};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn seeded_store() -> InMemoryStore {
    InMemoryStore::with_records(
        vec![
            CanonicalArticle::new(1, "Butter 250g", 1)
                .with_article_number("X1")
                .with_category("Molkerei")
                .with_ocr_name("BUTTER 250G"),
            CanonicalArticle::new(2, "Sahne 30%", 1)
                .with_article_number("S2")
                .with_category("Molkerei"),
            CanonicalArticle::new(3, "Weizenmehl Type 405", 2).with_category("Trockenware"),
        ],
        vec![
            CanonicalSupplier::new(1, "Metro AG"),
            CanonicalSupplier::new(2, "Transgourmet Deutschland"),
        ],
    )
}

fn headers(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn row(cells: &[(&str, &str)]) -> ImportRow {
    cells.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[tokio::test]
async fn test_import_export_file_end_to_end() -> Result<()> {
    init_logging();
    let store = seeded_store();
    let snapshot = CatalogSnapshot::load(&store).await?;

    let file_headers = headers(&[
        "Artikelname",
        "Lieferant",
        "Art.-Nr.",
        "Gebindepreis",
        "Kategorie",
        "MwSt",
        "Allergene",
        "Energie (kcal)",
        "Fett",
        "Zucker",
    ]);
    let session = ImportSession::prepare(
        &file_headers,
        &SynonymDictionary::standard(),
        &FieldPriority::standard(),
        MatchingConfig::default(),
    );
    assert_eq!(session.mapping().header_for(TargetField::ArticleNumber), Some("Art.-Nr."));
    assert_eq!(session.mapping().header_for(TargetField::VatRate), Some("MwSt"));
    assert_eq!(session.mapping().cluster_headers().len(), 3);

    let rows = vec![
        row(&[
            ("Artikelname", "Crème fraîche"),
            ("Lieferant", "METRO AG"),
            ("Art.-Nr.", "CF-9"),
            ("Gebindepreis", "2,49 €"),
            ("Kategorie", "molkerei"),
            ("MwSt", "7 %"),
            ("Allergene", "Milch; Laktose"),
            ("Energie (kcal)", "292"),
            ("Fett", "30"),
            ("Zucker", "2,4"),
        ]),
        // stored under the same supplier with a differently cased number
        row(&[("Artikelname", "Butter"), ("Lieferant", "Metro AG"), ("Art.-Nr.", "x1")]),
        row(&[("Artikelname", "Dinkelmehl 630"), ("Lieferant", "Transgourmet")]),
        row(&[("Artikelname", "dinkelmehl 630"), ("Lieferant", "Transgourmet")]),
        row(&[("Artikelname", ""), ("Lieferant", "Metro AG")]),
        row(&[("Artikelname", "Olivenöl"), ("Gebindepreis", "auf Anfrage")]),
    ];
    let report = session.run(&rows, &snapshot);

    assert_eq!(report.accepted.len(), 2);
    let creme = &report.accepted[0];
    assert_eq!(creme.supplier, SupplierRef::Id(1));
    assert_eq!(creme.article_number.as_deref(), Some("CF-9"));
    assert_eq!(creme.bundle_price, Some(2.49));
    assert_eq!(creme.details.category.as_deref(), Some("Molkerei"));
    assert_eq!(creme.details.vat_rate, Some(7.0));
    assert_eq!(creme.details.allergens, vec!["Milch", "Laktose"]);
    let nutrition = creme.details.nutrition.clone().unwrap();
    assert_eq!(nutrition.energy_kcal, Some(292.0));
    assert_eq!(nutrition.fat, Some(30.0));
    assert_eq!(nutrition.sugar, Some(2.4));

    assert_eq!(report.accepted[1].supplier, SupplierRef::Id(2));

    assert_eq!(report.duplicates.len(), 2);
    assert_eq!(report.duplicates[0].verdict.matched_on, MatchedOn::ArticleNumber);
    assert_eq!(
        report.duplicates[0].verdict.conflicting_record,
        Some(ConflictingRecord::Stored(1))
    );
    assert_eq!(report.duplicates[1].verdict.matched_on, MatchedOn::Name);
    assert_eq!(
        report.duplicates[1].verdict.conflicting_record,
        Some(ConflictingRecord::Batch(1))
    );

    assert_eq!(report.rejected.len(), 2);
    assert_eq!(report.rejected[0].reason, RejectReason::MissingName);
    assert_eq!(report.rejected[1].reason, RejectReason::MissingSupplier);

    let new_articles: Vec<_> = report
        .accepted
        .into_iter()
        .filter_map(|a| a.into_new_article())
        .collect();
    let ids = store.save_articles(&new_articles).await?;
    assert_eq!(ids, vec![4, 5]);
    assert_eq!(store.list_articles(Some(1)).await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_import_defaults_and_warnings() -> Result<()> {
    init_logging();
    let snapshot = CatalogSnapshot::load(&seeded_store()).await?;

    let mut session = ImportSession::prepare(
        &headers(&["Bezeichnung", "Preis"]),
        &SynonymDictionary::standard(),
        &FieldPriority::standard(),
        MatchingConfig::default(),
    );
    assert!(session.mapping().unmapped_fields().contains(&TargetField::Supplier));
    session.set_defaults(ImportDefaults {
        supplier: Some(SupplierRef::Id(2)),
        category: Some("Trockenware".to_string()),
        vat_rate: Some(7.0),
        ..Default::default()
    });

    let rows = vec![
        row(&[("Bezeichnung", "Hartweizengrieß"), ("Preis", "auf Anfrage")]),
        row(&[("Bezeichnung", "Weizenmehl Type 405"), ("Preis", "0.89")]),
    ];
    let report = session.run(&rows, &snapshot);

    assert_eq!(report.accepted.len(), 1);
    let semolina = &report.accepted[0];
    assert_eq!(semolina.supplier, SupplierRef::Id(2));
    assert_eq!(semolina.bundle_price, None);
    assert_eq!(semolina.details.category.as_deref(), Some("Trockenware"));
    assert_eq!(semolina.details.vat_rate, Some(7.0));

    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].field, TargetField::BundlePrice);
    assert_eq!(report.warnings[0].row, 0);

    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(
        report.duplicates[0].verdict.conflicting_record,
        Some(ConflictingRecord::Stored(3))
    );
    Ok(())
}

#[test]
fn test_manual_mapping_correction() {
    let mut session = ImportSession::prepare(
        &headers(&["Artikel", "Info", "Lieferant"]),
        &SynonymDictionary::standard(),
        &FieldPriority::new([TargetField::Name, TargetField::Supplier, TargetField::Notes]),
        MatchingConfig::default(),
    );
    assert_eq!(session.mapping().header_for(TargetField::Notes), None);

    session.mapping_mut().assign(TargetField::Notes, "Info");
    session.mapping_mut().assign(TargetField::Name, "Info");
    assert_eq!(session.mapping().header_for(TargetField::Name), Some("Info"));
    assert_eq!(session.mapping().header_for(TargetField::Notes), None);
}

#[test]
fn test_custom_dictionary_from_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"{{"name": ["Warenbezeichnung"], "supplier": ["Kreditor"], "bundlePrice": ["EK netto"]}}"#
    )?;

    let dictionary = SynonymDictionary::from_json_file(file.path())?;
    let session = ImportSession::prepare(
        &headers(&["Warenbezeichnung", "Kreditor", "EK netto"]),
        &dictionary,
        &FieldPriority::new([TargetField::Name, TargetField::Supplier, TargetField::BundlePrice]),
        MatchingConfig::default(),
    );
    assert_eq!(session.mapping().header_for(TargetField::Name), Some("Warenbezeichnung"));
    assert_eq!(session.mapping().header_for(TargetField::Supplier), Some("Kreditor"));
    assert_eq!(session.mapping().header_for(TargetField::BundlePrice), Some("EK netto"));
    Ok(())
}

fn metro_receipt() -> ScannedReceipt {
    ScannedReceipt {
        supplier_text: Some("Metro AG Filiale Hamburg".to_string()),
        items: vec![
            ScannedLineItem::new(2.0, 2.19).with_article_number("X1").with_ocr_name("DE BUTTER 250G"),
            ScannedLineItem::new(1.0, 3.49).with_ocr_name("SAHNE 30% 1L"),
            ScannedLineItem::new(4.0, 0.99).with_ocr_name("MEHL 405"),
        ],
    }
}

#[tokio::test]
async fn test_receipt_review_end_to_end() -> Result<()> {
    init_logging();
    let store = seeded_store();
    let snapshot = CatalogSnapshot::load(&store).await?;

    let mut review = ReceiptReview::new();
    review.begin(metro_receipt())?;
    assert_eq!(review.state(), ReviewState::Initializing);

    let lines = review.resolve_and_link(&snapshot)?;
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].decision.article_id(), Some(1));
    assert_eq!(lines[1].decision, LinkDecision::Unlinked(UnlinkReason::NoMatch));
    assert_eq!(lines[2].decision, LinkDecision::Unlinked(UnlinkReason::NoMatch));
    assert_eq!(review.supplier(), Some(SupplierResolution::Resolved(1)));
    assert_eq!(review.state(), ReviewState::Editing);

    review.link_manually(1, 2, &snapshot)?;
    review.edit_item(1, &snapshot, |item| item.unit_price = 3.29)?;
    match &review.lines()[1].decision {
        LinkDecision::Linked(linked) => {
            assert_eq!(linked.matched_by, MatchStrategy::Manual);
            assert_eq!(linked.merged.unit_price, 3.29);
            assert_eq!(linked.merged.details.category.as_deref(), Some("Molkerei"));
        }
        other => panic!("expected a manual link, got {other:?}"),
    }

    let updates = review.history_updates();
    assert_eq!(
        updates,
        vec![(1, "DE BUTTER 250G".to_string()), (2, "SAHNE 30% 1L".to_string())]
    );
    assert_eq!(review.persist_history(&store).await?, 2);

    // the learned spelling links automatically next time
    let snapshot = CatalogSnapshot::load(&store).await?;
    let reviewed = review.finish()?;
    assert_eq!(reviewed.len(), 3);
    assert_eq!(review.state(), ReviewState::Idle);

    review.begin(metro_receipt())?;
    let lines = review.resolve_and_link(&snapshot)?;
    match &lines[1].decision {
        LinkDecision::Linked(linked) => {
            assert_eq!(linked.article_id, 2);
            assert_eq!(linked.matched_by, MatchStrategy::OcrNameHistory);
            assert_eq!(linked.history_entry, None);
        }
        other => panic!("expected a history link, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_supplier_change_relinks_but_keeps_edits() -> Result<()> {
    let snapshot = CatalogSnapshot::load(&seeded_store()).await?;
    let receipt = ScannedReceipt {
        supplier_text: Some("Unbekannter Großhandel".to_string()),
        items: vec![ScannedLineItem::new(1.0, 1.0).with_article_number("X1")],
    };

    let mut review = ReceiptReview::new();
    review.begin(receipt)?;
    review.resolve_and_link(&snapshot)?;
    assert_eq!(review.supplier(), Some(SupplierResolution::Unresolved));
    assert!(!review.lines()[0].decision.is_linked());

    review.edit_item(0, &snapshot, |item| item.quantity = 6.0)?;
    let lines = review.change_supplier(1, &snapshot)?;
    assert_eq!(lines[0].item.quantity, 6.0);
    match &lines[0].decision {
        LinkDecision::Linked(linked) => {
            assert_eq!(linked.article_id, 1);
            assert_eq!(linked.merged.quantity, 6.0);
        }
        other => panic!("expected a link after supplier change, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_review_rejects_out_of_order_calls() {
    let snapshot = CatalogSnapshot::new(vec![], vec![]);
    let mut review = ReceiptReview::new();

    let err = review.resolve_and_link(&snapshot).unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTransition {
            from: ReviewState::Idle,
            to: ReviewState::Linking
        }
    ));
    assert!(review.edit_item(0, &snapshot, |_| {}).is_err());

    review.begin(metro_receipt()).unwrap();
    assert!(review.begin(metro_receipt()).is_err());
    review.reset();
    assert_eq!(review.state(), ReviewState::Idle);
    assert!(review.lines().is_empty());
}
