//! End-to-end signing through the public API

use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use pretty_assertions::assert_eq;
use signpad_core::payload::{decode_base64, encode_base64};
use signpad_core::{
    sign_document, CapturedSignature, PdfDocument, PlacementOutcome, SignatureRaster,
    SignaturePlacement, SigningSession, SignpadConfig, SkipReason, SourceDocument,
};

const A4: [f32; 4] = [0.0, 0.0, 595.28, 841.89];

const SIGNATURE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="200" viewBox="0 0 400 200">
  <g fill="none" stroke="#1b2a4a" stroke-width="2.5" stroke-linecap="round">
    <path d="M 20 150 C 60 20 100 20 120 120 S 180 180 200 80"/>
    <path d="M 210 90 Q 260 10 300 120 T 380 60"/>
  </g>
</svg>"##;

/// Pages get their own MediaBox; `user_unit` is applied to every page
fn build_pdf(pages: usize, media_box: [f32; 4], user_unit: Option<f32>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for n in 1..=pages {
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            format!("BT /F1 12 Tf 72 720 Td (Clause {}) Tj ET", n).into_bytes(),
        ));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => media_box.iter().map(|v| Object::Real(*v)).collect::<Vec<_>>(),
        };
        if let Some(unit) = user_unit {
            page.set("UserUnit", Object::Real(unit));
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn png_data_uri() -> String {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, 8, 4);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&[0u8; 8 * 4 * 4]).unwrap();
    }
    format!("data:image/png;base64,{}", encode_base64(&out))
}

fn capture() -> (CapturedSignature, SignatureRaster) {
    (
        CapturedSignature::from_svg(SIGNATURE_SVG).unwrap(),
        SignatureRaster::from_data_uri(&png_data_uri()).unwrap(),
    )
}

fn applied_transform(outcome: &PlacementOutcome) -> &signpad_core::PlacementTransform {
    match outcome {
        PlacementOutcome::Applied { transform, .. } => transform,
        other => panic!("expected applied placement, got {:?}", other),
    }
}

fn page_has_strokes(pdf: &PdfDocument, page: u32) -> bool {
    let content = String::from_utf8_lossy(&pdf.page_content(page).unwrap()).to_string();
    content.contains(" re") && content.contains(" RG")
}

fn uncompressed() -> SignpadConfig {
    SignpadConfig {
        compress_output: false,
        ..Default::default()
    }
}

#[test]
fn default_placement_on_a4() {
    let (sig, raster) = capture();
    let pdf = build_pdf(1, A4, None);
    let signed = sign_document(&pdf, &sig, &raster, &[SignaturePlacement::default()], &uncompressed())
        .unwrap()
        .unwrap();

    let t = applied_transform(&signed.outcomes[0]);
    assert!((t.target.x - 141.7).abs() < 0.1, "x = {}", t.target.x);
    assert!((t.target.y - 530.1).abs() < 0.1, "y = {}", t.target.y);
    assert!((t.target.width - 226.8).abs() < 0.1);
    assert!((t.target.height - 113.4).abs() < 0.1);
}

#[test]
fn user_unit_two_halves_the_factor() {
    let (sig, raster) = capture();
    let pdf = build_pdf(1, A4, Some(2.0));
    let signed = sign_document(&pdf, &sig, &raster, &[], &uncompressed())
        .unwrap()
        .unwrap();

    let t = applied_transform(&signed.outcomes[0]);
    let factor = (72.0 / 2.54) / 2.0;
    assert!((t.target.width - 8.0 * factor).abs() < 1e-6);
    assert!((t.target.height - 4.0 * factor).abs() < 1e-6);
    assert!((t.target.x - 5.0 * factor).abs() < 1e-6);
}

#[test]
fn round_trip_keeps_pages_and_touches_only_targets() {
    let (sig, raster) = capture();
    let pdf = build_pdf(4, A4, None);
    let placements = [
        SignaturePlacement { page: 2, ..Default::default() },
        SignaturePlacement { page: 4, left: 2.0, top: 20.0, width: 6.0, height: 2.0 },
    ];
    let signed = sign_document(&pdf, &sig, &raster, &placements, &SignpadConfig::default())
        .unwrap()
        .unwrap();

    let output = PdfDocument::from_bytes(&decode_base64(&signed.result.signed_document.data).unwrap())
        .unwrap();
    assert_eq!(output.page_count(), 4);
    let touched: Vec<bool> = (1..=4).map(|p| page_has_strokes(&output, p)).collect();
    assert_eq!(touched, vec![false, true, false, true]);

    // original text survives on every page
    for page in 1..=4 {
        let content = String::from_utf8_lossy(&output.page_content(page).unwrap()).to_string();
        assert!(content.contains(&format!("(Clause {})", page)));
    }
}

#[test]
fn out_of_range_pages_do_not_block_the_save() {
    let (sig, raster) = capture();
    let pdf = build_pdf(2, A4, None);
    let placements = [
        SignaturePlacement { page: 0, ..Default::default() },
        SignaturePlacement { page: 7, ..Default::default() },
        SignaturePlacement { page: 1, ..Default::default() },
    ];
    let signed = sign_document(&pdf, &sig, &raster, &placements, &uncompressed())
        .unwrap()
        .unwrap();

    assert!(matches!(
        signed.outcomes[0],
        PlacementOutcome::Skipped { reason: SkipReason::PageOutOfRange { page: 0, page_count: 2 }, .. }
    ));
    assert!(matches!(
        signed.outcomes[1],
        PlacementOutcome::Skipped { reason: SkipReason::PageOutOfRange { page: 7, .. }, .. }
    ));
    assert!(signed.outcomes[2].is_applied());
    assert_eq!(signed.applied_count(), 1);
}

#[test]
fn capture_without_paths_produces_no_result() {
    assert!(CapturedSignature::from_svg(r#"<svg viewBox="0 0 300 100"><g/></svg>"#).is_none());

    let (sig, raster) = capture();
    let empty = CapturedSignature { paths: vec![], ..sig };
    let result = sign_document(&build_pdf(1, A4, None), &empty, &raster, &[], &uncompressed()).unwrap();
    assert!(result.is_none());
}

#[test]
fn identical_points_skip_without_panicking() {
    let sig = CapturedSignature::from_svg(r#"<svg><path d="M 40 40 L 40 40 L 40 40"/></svg>"#).unwrap();
    let (_, raster) = capture();
    let signed = sign_document(&build_pdf(1, A4, None), &sig, &raster, &[], &uncompressed())
        .unwrap()
        .unwrap();
    assert!(matches!(
        signed.outcomes[0],
        PlacementOutcome::Skipped { reason: SkipReason::DegenerateSignature { .. }, .. }
    ));
}

#[test]
fn batch_signs_only_the_document_with_a_capture() {
    let (sig, raster) = capture();
    let mut session = SigningSession::new(SignpadConfig::default());
    for id in ["doc-1", "doc-2", "doc-3"] {
        session
            .add_document(SourceDocument::new(id, build_pdf(1, A4, None), vec![]))
            .unwrap();
    }
    session.attach_signature("doc-2", sig, raster).unwrap();

    let report = session.save().unwrap();
    assert_eq!(report.results.len(), 1);
    assert!(report.results.contains_key("doc-2"));

    let results = serde_json::to_value(report.composition_results()).unwrap();
    assert_eq!(results["doc-2"]["signedDocument"]["type"], "application/pdf");
    assert_eq!(results["doc-2"]["signatureImage"]["type"], "image/png");
}

#[test]
fn normalized_svg_round_trips() {
    let (sig, _) = capture();
    let normalized = sig.to_svg();
    assert!(!normalized.contains(r#"width="400""#));
    assert_eq!(CapturedSignature::from_svg(&normalized).unwrap(), sig);
}
