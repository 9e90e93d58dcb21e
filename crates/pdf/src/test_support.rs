//! Small PDFs generated in memory for tests.  Enabled for this crate's
//! own tests and, through the `test-support` feature, for dependents.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One `BT .. ET` block drawn at x = 72, in bold Helvetica (`F1`) or
/// regular Helvetica (`F2`).
pub struct SampleLine {
    pub text: &'static str,
    pub size: i64,
    pub y: i64,
    pub bold: bool,
}

impl SampleLine {
    pub fn new(text: &'static str, size: i64, y: i64) -> Self {
        Self {
            text,
            size,
            y,
            bold: true,
        }
    }

    pub fn regular(text: &'static str, size: i64, y: i64) -> Self {
        Self {
            bold: false,
            ..Self::new(text, size, y)
        }
    }

    fn font_key(&self) -> &'static str {
        if self.bold {
            "F1"
        } else {
            "F2"
        }
    }
}

/// Build a US Letter document with one entry of `pages` per page.
pub fn sample_pdf(pages: &[Vec<SampleLine>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => bold_id, "F2" => regular_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for line in lines {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![line.font_key().into(), line.size.into()]),
                Operation::new("Td", vec![72.into(), line.y.into()]),
                Operation::new("Tj", vec![Object::string_literal(line.text)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().expect("encode content stream")));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
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

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize sample document");
    out
}
