//! Integration tests for invitation
//!
//! Fragments are lopdf-built fixtures whose pages have distinct widths, so the
//! merged page order can be read back from the MediaBoxes. Generated pages are
//! 461 points wide.

use async_trait::async_trait;
use invitation::{
    Assembler, AssemblyStage, AssetSource, FetchError, GeneratedDocumentSpec, InvitationConfig,
    InvitationGenerator, InvitationKind, InvitationRequest, InviteError, MemorySource, PageItem,
    Position, StaticFragment,
};
use lopdf::dictionary;
use pdf_core::{PageSize, PdfDocument};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Mutex;
use text_fit::{BlockFace, FontBook, FontFamily};

const GENERATED_WIDTH: i64 = 461;

/// Both layers of the couple invitation, set in the deterministic test face
const CONFIG: &str = r##"{
    "pageSize": { "width": 461, "height": 670 },
    "layers": [
        {
            "background": "img/page1.png",
            "position": { "x": 180, "y": 440 },
            "text": {
                "canvasWidth": 310, "canvasHeight": 240,
                "fontSize": 15, "minFontSize": 15, "fontWeight": "600",
                "color": "#e50780", "fontFamily": "block", "textAlign": "left",
                "paddingX": 0, "paddingY": 20, "lineHeight": 24, "allowResize": false
            }
        },
        {
            "background": "img/page2.png",
            "position": { "x": 175, "y": 142 },
            "text": {
                "canvasWidth": 310, "canvasHeight": 410,
                "fontSize": 13, "minFontSize": 13, "fontWeight": "600",
                "color": "#860b0c", "fontFamily": "block", "textAlign": "left",
                "paddingX": 0, "paddingY": 70, "lineHeight": 34, "allowResize": false
            }
        }
    ],
    "fragments": {
        "opening": "pdf/H1.pdf",
        "middle": { "couple": "pdf/H2.pdf", "fullFamily": "pdf/H2_2.pdf" },
        "closing": "pdf/H3.pdf"
    }
}"##;

/// A PDF with one page per entry, each `width` points wide
fn fragment_pdf(widths: &[i64]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for width in widths {
        let contents_id = doc.add_object(lopdf::Stream::new(
            dictionary! {},
            b"0 0 m 10 10 l S".to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (*width).into(), 800.into()],
            "Contents" => contents_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        lopdf::Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => widths.len() as i64,
            "Kids" => kids,
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

fn background_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([250, 240, 220]));
    let mut buffer = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut buffer),
        image::ImageFormat::Png,
    )
    .unwrap();
    buffer
}

fn assets() -> MemorySource {
    MemorySource::new()
        .with("pdf/H1.pdf", fragment_pdf(&[100, 101]))
        .with("pdf/H2.pdf", fragment_pdf(&[200]))
        .with("pdf/H2_2.pdf", fragment_pdf(&[250, 251]))
        .with("pdf/H3.pdf", fragment_pdf(&[300, 301, 302]))
        .with("img/page1.png", background_png())
        .with("img/page2.png", background_png())
}

fn fonts() -> FontBook {
    let mut fonts = FontBook::new();
    fonts.register("block", FontFamily::new(BlockFace).with_bold(BlockFace));
    fonts
}

fn generator_with<S: AssetSource>(config: &str, source: S) -> InvitationGenerator<S> {
    let config = InvitationConfig::from_json(config).unwrap();
    InvitationGenerator::new(config, fonts(), source).unwrap()
}

fn page_widths(bytes: &[u8]) -> Vec<i64> {
    let doc = PdfDocument::open_from_bytes(bytes).unwrap();
    (1..=doc.page_count())
        .map(|page| doc.page_size(page).unwrap().width.round() as i64)
        .collect()
}

fn xobject_count(bytes: &[u8], page: u32) -> usize {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    let page_id = doc.get_pages()[&page];
    let page_dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let resources = page_dict.get(b"Resources").unwrap().as_dict().unwrap();
    resources.get(b"XObject").unwrap().as_dict().unwrap().len()
}

/// Records every reference fetched, in order
struct RecordingSource {
    inner: MemorySource,
    fetched: Mutex<Vec<String>>,
}

impl RecordingSource {
    fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            fetched: Mutex::new(Vec::new()),
        }
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetSource for RecordingSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        self.fetched.lock().unwrap().push(reference.to_string());
        self.inner.fetch(reference).await
    }
}

#[tokio::test]
async fn test_couple_invitation_page_order() {
    let generator = generator_with(CONFIG, assets());
    let request = InvitationRequest::new("Alice & Bob", InvitationKind::Couple).unwrap();

    let invitation = generator.generate(&request).await.unwrap();

    assert_eq!(
        page_widths(&invitation.bytes),
        vec![100, 101, GENERATED_WIDTH, 200, GENERATED_WIDTH, 300, 301, 302]
    );
    assert_eq!(invitation.filename, "Alice & Bob.pdf");
    assert_eq!(invitation.layers.len(), 2);
}

#[tokio::test]
async fn test_full_family_uses_second_middle_fragment() {
    let generator = generator_with(CONFIG, assets());
    let request = InvitationRequest::new("The Harsora Family", InvitationKind::FullFamily).unwrap();

    let invitation = generator.generate(&request).await.unwrap();

    assert_eq!(
        page_widths(&invitation.bytes),
        vec![100, 101, GENERATED_WIDTH, 250, 251, GENERATED_WIDTH, 300, 301, 302]
    );
}

#[tokio::test]
async fn test_generated_pages_carry_background_and_name() {
    let generator = generator_with(CONFIG, assets());
    let request = InvitationRequest::new("Alice", InvitationKind::Couple).unwrap();

    let invitation = generator.generate(&request).await.unwrap();

    assert_eq!(xobject_count(&invitation.bytes, 3), 2);
    assert_eq!(xobject_count(&invitation.bytes, 5), 2);

    let first = &invitation.layers[0];
    assert_eq!((first.width, first.height), (310, 240));
    assert_eq!(first.layout.lines.len(), 1);
    assert_eq!(first.layout.lines[0].y, 20.0);
    assert_eq!(first.layout.anchor_x, 0.0);
}

#[tokio::test]
async fn test_assets_fetched_sequentially_in_merge_order() {
    let config = InvitationConfig::from_json(CONFIG).unwrap();
    let generator =
        InvitationGenerator::new(config, fonts(), RecordingSource::new(assets())).unwrap();
    let request = InvitationRequest::new("Alice", InvitationKind::Couple).unwrap();

    generator.generate(&request).await.unwrap();

    assert_eq!(
        generator.source().fetched(),
        vec![
            "img/page1.png",
            "img/page2.png",
            "pdf/H1.pdf",
            "pdf/H2.pdf",
            "pdf/H3.pdf"
        ]
    );
}

#[tokio::test]
async fn test_middle_fragment_failure_aborts_assembly() {
    let mut source = MemorySource::new()
        .with("pdf/H1.pdf", fragment_pdf(&[100]))
        .with("pdf/H3.pdf", fragment_pdf(&[300]));
    source.insert("img/page1.png", background_png());
    source.insert("img/page2.png", background_png());
    let source = RecordingSource::new(source);

    let mut spec = GeneratedDocumentSpec::new(PageSize::new(461.0, 670.0));
    spec.push_page(PageItem {
        image: background_png(),
        width: 8.0,
        height: 8.0,
        position: Position { x: 10.0, y: 10.0 },
        page_break_before: false,
    });
    let fragments = [
        StaticFragment::new("pdf/H1.pdf"),
        StaticFragment::new("pdf/H2.pdf"),
        StaticFragment::new("pdf/H3.pdf"),
    ];

    let err = Assembler::new(&source)
        .assemble(&spec, &fragments)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), AssemblyStage::Fetch);
    assert_eq!(err.reference(), Some("pdf/H2.pdf"));
    // the closing fragment is never requested
    assert_eq!(source.fetched(), vec!["pdf/H1.pdf", "pdf/H2.pdf"]);
}

#[tokio::test]
async fn test_missing_fragment_surfaces_as_assembly_error() {
    let generator = generator_with(CONFIG, assets().with("pdf/H2.pdf", b"not a pdf".to_vec()));
    let request = InvitationRequest::new("Alice", InvitationKind::Couple).unwrap();

    match generator.generate(&request).await {
        Err(InviteError::Assembly(err)) => {
            assert_eq!(err.stage(), AssemblyStage::Decode);
            assert_eq!(err.reference(), Some("pdf/H2.pdf"));
        }
        other => panic!("expected decode failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_single_layer_skips_second_generated_page() {
    let mut config = InvitationConfig::from_json(CONFIG).unwrap();
    config.layers.truncate(1);
    let generator = InvitationGenerator::new(config, fonts(), assets()).unwrap();
    let request = InvitationRequest::new("Alice", InvitationKind::Couple).unwrap();

    let invitation = generator.generate(&request).await.unwrap();

    assert_eq!(
        page_widths(&invitation.bytes),
        vec![100, 101, GENERATED_WIDTH, 200, 300, 301, 302]
    );
}

#[tokio::test]
async fn test_missing_background_is_reported() {
    let source = MemorySource::new()
        .with("pdf/H1.pdf", fragment_pdf(&[100]))
        .with("pdf/H2.pdf", fragment_pdf(&[200]))
        .with("pdf/H3.pdf", fragment_pdf(&[300]))
        .with("img/page1.png", background_png());
    let generator = generator_with(CONFIG, source);
    let request = InvitationRequest::new("Alice", InvitationKind::Couple).unwrap();

    match generator.generate(&request).await {
        Err(InviteError::Background { reference, .. }) => assert_eq!(reference, "img/page2.png"),
        other => panic!("expected background failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_layers_without_background() {
    let mut config = InvitationConfig::from_json(CONFIG).unwrap();
    for layer in &mut config.layers {
        layer.background = None;
    }
    let source = MemorySource::new()
        .with("pdf/H1.pdf", fragment_pdf(&[100]))
        .with("pdf/H2.pdf", fragment_pdf(&[200]))
        .with("pdf/H3.pdf", fragment_pdf(&[300]));
    let generator = InvitationGenerator::new(config, fonts(), source).unwrap();
    let request = InvitationRequest::new("Alice", InvitationKind::Couple).unwrap();

    let invitation = generator.generate(&request).await.unwrap();

    assert_eq!(xobject_count(&invitation.bytes, 2), 1);
}

#[tokio::test]
async fn test_append_transform_changes_text_not_filename() {
    let mut config = InvitationConfig::from_json(CONFIG).unwrap();
    config.transform = invitation::NameTransform::Append(",".to_string());
    let generator = InvitationGenerator::new(config, fonts(), assets()).unwrap();
    let request = InvitationRequest::new("  Alice  ", InvitationKind::Couple).unwrap();

    let invitation = generator.generate(&request).await.unwrap();

    assert_eq!(invitation.layers[0].layout.lines[0].text, "Alice,");
    assert_eq!(invitation.filename, "Alice.pdf");
}

#[tokio::test]
async fn test_long_name_wraps_on_generated_page() {
    let generator = generator_with(CONFIG, assets());
    let name = "Shri Rameshbhai Harjivanbhai Harsora and Smt. Savitaben Rameshbhai Harsora";
    let request = InvitationRequest::new(name, InvitationKind::Couple).unwrap();

    let invitation = generator.generate(&request).await.unwrap();

    let second = &invitation.layers[1].layout;
    assert!(second.lines.len() > 1);
    assert_eq!(second.lines[1].y, 70.0 + 34.0);
}

#[test]
fn test_unknown_font_family_is_rejected() {
    let config = InvitationConfig::from_json(CONFIG).unwrap();
    let result = InvitationGenerator::new(config, FontBook::new(), assets());
    assert!(matches!(result, Err(InviteError::Config(_))));
}

#[test]
fn test_shipped_configs_are_valid() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../configs");

    let padding = InvitationConfig::from_file(dir.join("invitation.json")).unwrap();
    assert_eq!(padding.layers.len(), 2);
    assert_eq!(padding.transform, invitation::NameTransform::None);
    assert_eq!(padding.page_size(), PageSize::new(461.0, 670.0));
    // only the first page pins its size
    assert!(!padding.layers[0].text.allow_resize);
    assert!(padding.layers[1].text.allow_resize);

    let fixed = InvitationConfig::from_file(dir.join("invitation-fixed-margin.json")).unwrap();
    assert_eq!(
        fixed.transform,
        invitation::NameTransform::Append(",".to_string())
    );
    assert_eq!(fixed.layers[0].text.wrap_threshold(), 290.0);
    assert!(fixed.layers[1].text.allow_resize);
    assert_eq!(
        fixed.fragments.sequence(InvitationKind::FullFamily),
        padding.fragments.sequence(InvitationKind::FullFamily)
    );
}
