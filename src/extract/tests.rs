use super::*;
use crate::acquire::ocr::EngineState;
use crate::model::Entry;

const PROFILE: &str = "张三\n\
姓名：张三\n\
性别：男\n\
年龄：28\n\
手机：138-1234-5678\n\
邮箱：zhangsan@example.com\n\
求职意向：后端工程师\n\
教育经历\n\
起止时间：2015-09 – 2019-06\n\
学校：浙江大学\n\
学历：本科\n\
专业：软件工程\n\
工作经历\n\
起止时间：2020-07 – 至今\n\
公司：星河科技有限公司\n\
职位：高级工程师\n\
主要职责：负责核心系统架构设计\n\
带领团队完成服务迁移\n\
起止时间：2020-03 – 2020-06\n\
公司：云帆网络\n\
职位：实习生\n\
荣誉奖项\n\
2018年 全国大学生程序设计竞赛 一等奖\n\
兴趣爱好：篮球、摄影\n\
自我评价\n\
认真负责，善于沟通";

fn unavailable_ocr() -> OcrEngineCell {
    OcrEngineCell::with_state(EngineState::Unavailable("not installed".to_string()))
}

#[test]
fn empty_input_yields_all_null_record_for_every_kind() {
    for kind in [SourceKind::Word, SourceKind::Pdf] {
        let outcome = parse_with(&[], kind, &ParseOptions::default(), &unavailable_ocr());

        assert_eq!(outcome.record, Record::default());
        assert!(outcome.record.is_empty());
        assert!(outcome.acquisition.text.is_empty());
    }
}

#[test]
fn unreadable_word_document_yields_all_null_record() {
    let outcome = parse_with(
        b"PK\x03\x04 definitely not a docx",
        SourceKind::Word,
        &ParseOptions::default(),
        &unavailable_ocr(),
    );

    assert!(outcome.record.is_empty());
    assert!(outcome.acquisition.warnings().count() > 0);
}

#[test]
fn blank_text_yields_all_null_record() {
    assert_eq!(parse_text(" \n\t\n", &ParseOptions::default()), Record::default());
}

#[test]
fn full_profile_populates_fields_sections_and_entries() {
    let record = parse_text(PROFILE, &ParseOptions::default());

    assert_eq!(record.name.as_deref(), Some("张三"));
    assert_eq!(record.gender.as_deref(), Some("男"));
    assert_eq!(record.age.as_deref(), Some("28"));
    assert_eq!(record.phone.as_deref(), Some("138-1234-5678"));
    assert_eq!(record.email.as_deref(), Some("zhangsan@example.com"));
    assert_eq!(record.job_target.as_deref(), Some("后端工程师"));
    assert_eq!(record.education_level.as_deref(), Some("本科"));
    assert_eq!(record.major.as_deref(), Some("软件工程"));

    assert_eq!(
        record.honors.as_deref(),
        Some("2018年 全国大学生程序设计竞赛 一等奖")
    );
    assert_eq!(record.hobbies.as_deref(), Some("篮球、摄影"));
    assert_eq!(record.self_assessment.as_deref(), Some("认真负责，善于沟通"));
    assert_eq!(record.certifications, None);

    assert_eq!(
        record.education_history,
        vec![Entry {
            start_time: Some("2015-09".to_string()),
            end_time: Some("2019-06".to_string()),
            school: Some("浙江大学".to_string()),
            degree: Some("本科".to_string()),
            major: Some("软件工程".to_string()),
            ..Entry::default()
        }]
    );
}

#[test]
fn two_entry_employment_section_keeps_order_and_attributes() {
    let record = parse_text(PROFILE, &ParseOptions::default());

    assert_eq!(
        record.employment_history,
        vec![
            Entry {
                start_time: Some("2020-07".to_string()),
                end_time: Some("至今".to_string()),
                company: Some("星河科技有限公司".to_string()),
                position: Some("高级工程师".to_string()),
                responsibilities: Some("负责核心系统架构设计 带领团队完成服务迁移".to_string()),
                ..Entry::default()
            },
            Entry {
                start_time: Some("2020-03".to_string()),
                end_time: Some("2020-06".to_string()),
                company: Some("云帆网络".to_string()),
                position: Some("实习生".to_string()),
                ..Entry::default()
            },
        ]
    );
}

#[test]
fn reparsing_serialized_record_fabricates_no_entries() {
    let record = parse_text(PROFILE, &ParseOptions::default());
    let education_json =
        serde_json::to_string(&record.education_history).expect("serialize education");
    let employment_json =
        serde_json::to_string(&record.employment_history).expect("serialize employment");
    let record_json = serde_json::to_string_pretty(&record).expect("serialize record");

    for json in [education_json, employment_json, record_json] {
        let reparsed = parse_text(&json, &ParseOptions::default());
        assert!(reparsed.education_history.len() <= record.education_history.len());
        assert!(reparsed.employment_history.len() <= record.employment_history.len());
    }
}

#[test]
fn whole_document_fallback_reads_unlabeled_timelines() {
    let text = "李四\n\
                2014-09 – 2018-06 复旦大学 硕士\n\
                2018-07 – 至今 星河科技有限公司 产品经理";

    let record = parse_text(text, &ParseOptions::default());

    assert_eq!(record.education_history.len(), 1);
    assert_eq!(record.education_history[0].school.as_deref(), Some("复旦大学"));
    assert_eq!(record.employment_history.len(), 1);
    assert_eq!(
        record.employment_history[0].position.as_deref(),
        Some("产品经理")
    );
}

#[test]
fn limits_are_taken_from_options() {
    let options = ParseOptions {
        field_max_chars: 3,
        section_max_chars: 4,
        ..ParseOptions::default()
    };

    let record = parse_text(PROFILE, &options);

    assert_eq!(record.job_target, None);
    assert_eq!(record.hobbies.as_deref(), Some("篮球、摄"));
}
