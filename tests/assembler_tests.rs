mod common;

#[cfg(test)]
mod assembler_tests {
    use super::common::{agreement_pdf, CHECKBOX_FIELDS, TEXT_FIELDS};
    use agreement_signing::assembler::form::find_field;
    use agreement_signing::assembler::{
        AgreementAssembler, AgreementFields, AssemblyError, SignatureStamp,
    };
    use agreement_signing::data_url;
    use image::{DynamicImage, GrayImage, Luma};
    use lopdf::{Document, Object};

    fn signature() -> String {
        let mut raster = GrayImage::from_pixel(50, 20, Luma([255]));
        for x in 5..45 {
            raster.put_pixel(x, 10, Luma([0]));
        }
        data_url::encode_png(&DynamicImage::ImageLuma8(raster)).unwrap()
    }

    fn fields(signature: String) -> AgreementFields {
        AgreementFields {
            full_name: "Jane Q Buyer".to_string(),
            start_date: "01/31/2024".to_string(),
            expiration_date: "03/31/2024".to_string(),
            signature,
        }
    }

    fn field_value(doc: &Document, name: &str) -> Object {
        let field = find_field(doc, name).unwrap();
        doc.get_dictionary(field.id).unwrap().get(b"V").unwrap().clone()
    }

    #[test]
    fn test_fills_every_agreement_field() {
        let assembled = AgreementAssembler::default()
            .assemble(&agreement_pdf(2, true), &fields(signature()))
            .unwrap();

        let report = &assembled.report;
        for name in TEXT_FIELDS.iter().chain(CHECKBOX_FIELDS.iter()) {
            assert!(report.is_filled(name), "{} was not filled", name);
        }
        assert!(report.skipped.is_empty());
        assert!(matches!(report.signature, SignatureStamp::Placed { .. }));

        let doc = Document::load_mem(&assembled.bytes).unwrap();
        assert_eq!(field_value(&doc, "Name").as_str().unwrap(), b"Jane Q Buyer");
        assert_eq!(field_value(&doc, "StartDate").as_str().unwrap(), b"01/31/2024");
        assert_eq!(field_value(&doc, "EndDate").as_str().unwrap(), b"03/31/2024");
        assert_eq!(field_value(&doc, "SigDate").as_str().unwrap(), b"01/31/2024");
        assert_eq!(field_value(&doc, "PercentageValue").as_str().unwrap(), b"1");
        assert_eq!(field_value(&doc, "Residential").as_name().unwrap(), b"On");
        assert_eq!(field_value(&doc, "Percentage").as_name().unwrap(), b"On");
    }

    #[test]
    fn test_signature_lands_on_last_page() {
        let assembled = AgreementAssembler::default()
            .assemble(&agreement_pdf(3, true), &fields(signature()))
            .unwrap();

        let doc = Document::load_mem(&assembled.bytes).unwrap();
        let pages = doc.get_pages();
        let last = *pages.get(&3).unwrap();
        let first = *pages.get(&1).unwrap();

        let has_signature = |page| {
            doc.get_page_content(page)
                .map(|content| String::from_utf8_lossy(&content).contains("/AgreementSignature Do"))
                .unwrap_or(false)
        };
        assert!(has_signature(last));
        assert!(!has_signature(first));

        match assembled.report.signature {
            SignatureStamp::Placed { rect } => {
                assert!((rect.x - 73.44).abs() < 0.01);
                assert!((rect.y - 221.76).abs() < 0.01);
            }
            other => panic!("expected a placed signature, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_form_skips_fields_but_keeps_signature() {
        let assembled = AgreementAssembler::default()
            .assemble(&agreement_pdf(1, false), &fields(signature()))
            .unwrap();

        let report = &assembled.report;
        assert!(report.filled.is_empty());
        assert_eq!(report.skipped.len(), 7);
        assert_eq!(report.skipped[0].field, "Name");
        assert!(matches!(report.signature, SignatureStamp::Placed { .. }));
        assert!(Document::load_mem(&assembled.bytes).is_ok());
    }

    #[test]
    fn test_empty_signature_is_not_stamped() {
        let assembled = AgreementAssembler::default()
            .assemble(&agreement_pdf(1, true), &fields(String::new()))
            .unwrap();
        assert_eq!(assembled.report.signature, SignatureStamp::Absent);
    }

    #[test]
    fn test_undecodable_signature_is_reported_not_fatal() {
        let assembled = AgreementAssembler::default()
            .assemble(&agreement_pdf(1, true), &fields("data:image/jpeg;base64,AAAA".to_string()))
            .unwrap();

        assert!(matches!(
            assembled.report.signature,
            SignatureStamp::Failed { .. }
        ));
        assert!(assembled.report.is_filled("Name"));
    }

    #[test]
    fn test_unparseable_source_is_an_error() {
        let result = AgreementAssembler::default().assemble(b"not a pdf", &fields(signature()));
        assert!(matches!(result, Err(AssemblyError::Parse(_))));
    }
}
