use casegen_map::SubstitutionMap;
use casegen_render::render;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Segment {
    Short,
    Long,
    Word(String),
}

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        Just(Segment::Short),
        Just(Segment::Long),
        "[a-z .;=]{1,8}".prop_map(Segment::Word),
    ]
}

proptest! {
    #[test]
    fn replaces_exactly_the_literals(
        short in "[A-M]{2,4}",
        suffix in "[N-Z]{1,4}",
        short_value in "[0-9]{0,5}",
        long_value in "[0-9a-z]{0,5}",
        segments in prop::collection::vec(segment(), 0..24),
    ) {
        let long = format!("{short}{suffix}");
        let mut map = SubstitutionMap::new();
        map.insert_rule(short.as_str(), short_value.as_str()).expect("short rule");
        map.insert_rule(long.as_str(), long_value.as_str()).expect("long rule");

        let mut template = String::new();
        let mut expected = String::new();
        for segment in &segments {
            match segment {
                Segment::Short => {
                    template.push_str(&short);
                    expected.push_str(&short_value);
                }
                Segment::Long => {
                    template.push_str(&long);
                    expected.push_str(&long_value);
                }
                Segment::Word(word) => {
                    template.push_str(word);
                    expected.push_str(word);
                }
            }
        }

        let first = render(template.as_bytes(), &map).expect("render");
        let second = render(template.as_bytes(), &map).expect("render");
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(String::from_utf8(first).expect("utf8"), expected);
    }

    #[test]
    fn text_without_literals_is_unchanged(text in "[a-z0-9 \n]{0,64}") {
        let mut map = SubstitutionMap::new();
        map.insert_rule("VelocityToReplace", "10").expect("rule");
        map.insert_rule("CaseName", "Case1").expect("rule");
        let rendered = render(text.as_bytes(), &map).expect("render");
        prop_assert_eq!(rendered, text.into_bytes());
    }
}
