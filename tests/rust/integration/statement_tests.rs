//! Statement text, parameters, aliases and query copies.

use std::sync::Arc;

use proxyql::{
    Arg, BuilderConfig, InterceptionResult, Invocation, Literal, ParamStyle, QueryError,
    QueryFactory, ReturnKind,
};

use super::fixtures::{factory, factory_with, CountingProvider};

#[test]
fn test_rebuild_is_byte_identical() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let sub = query.subquery().unwrap();
    let other = sub.from("Person").unwrap();
    sub.where_(other.get_i64("getAge").unwrap())
        .unwrap()
        .gt(person.get_i64("getAge").unwrap())
        .unwrap();
    query.exists(&sub).unwrap();
    query
        .select(person.navigate("getSpouse").unwrap().get_str("getName").unwrap())
        .unwrap();

    let first = query.build().unwrap();
    let second = query.build().unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.text,
        "select person_1.name from Person person_0 inner join person_0.spouse person_1 \
         where exists (select person_2 from Person person_2 where person_2.age > person_0.age)"
    );
}

#[test]
fn test_aliases_unique_across_subqueries() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    for _ in 0..3 {
        let sub = query.subquery().unwrap();
        let other = sub.from("Person").unwrap();
        sub.where_(other.get_i64("getId").unwrap())
            .unwrap()
            .eq(person.get_i64("getId").unwrap())
            .unwrap();
        query.exists(&sub).unwrap();
    }

    let text = query.build().unwrap().text;
    for alias in ["person_0", "person_1", "person_2", "person_3"] {
        assert!(
            text.contains(&format!("Person {}", alias)),
            "missing declaration of {} in {}",
            alias,
            text
        );
    }
    assert!(!text.contains("person_4"));
}

#[test]
fn test_copy_is_independent() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    query
        .where_(person.get_i64("getAge").unwrap())
        .unwrap()
        .gt(18)
        .unwrap();

    let copy = query.copy();
    assert!(!copy.same_root(&query));
    let copied_person = copy.rebind(&person).unwrap();
    copy.where_(copied_person.get_str("getName").unwrap())
        .unwrap()
        .eq("Bob")
        .unwrap();

    assert_eq!(
        query.build().unwrap().text,
        "from Person person_0 where person_0.age > ?"
    );
    assert_eq!(
        copy.build().unwrap().text,
        "from Person person_0 where person_0.age > ? and person_0.name = ?"
    );

    query.select(person.get_i64("getId").unwrap()).unwrap();
    assert_eq!(
        copy.build().unwrap().text,
        "from Person person_0 where person_0.age > ? and person_0.name = ?"
    );
}

#[test]
fn test_named_params_listed_once() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let min = query.param("min", 18).unwrap();

    query
        .where_(person.get_i64("getAge").unwrap())
        .unwrap()
        .gte(&min)
        .unwrap()
        .or(person.navigate("getSpouse").unwrap().get_i64("getAge").unwrap())
        .unwrap()
        .gte(&min)
        .unwrap();

    let statement = query.build().unwrap();
    assert_eq!(
        statement.text,
        "from Person person_0 inner join person_0.spouse person_1 \
         where person_0.age >= :min or person_1.age >= :min"
    );
    assert_eq!(statement.params.len(), 1);
    assert_eq!(statement.params[0].placeholder, ":min");
    assert_eq!(statement.params[0].value, Literal::Int(18));
}

#[test]
fn test_ordinal_param_style() {
    let config = BuilderConfig {
        param_style: ParamStyle::Ordinal,
        ..Default::default()
    };
    let query = factory_with(config).select();
    let person = query.from("Person").unwrap();
    query
        .where_(person.get_i64("getAge").unwrap())
        .unwrap()
        .between(18, 65)
        .unwrap()
        .and(person.get_str("getName").unwrap())
        .unwrap()
        .in_list(vec![Arg::from("Ann"), Arg::from("Bob")])
        .unwrap();

    let statement = query.build().unwrap();
    assert_eq!(
        statement.text,
        "from Person person_0 where person_0.age between ?1 and ?2 \
         and person_0.name in (?3, ?4)"
    );
    let placeholders: Vec<&str> = statement
        .params
        .iter()
        .map(|p| p.placeholder.as_str())
        .collect();
    assert_eq!(placeholders, vec!["?1", "?2", "?3", "?4"]);
}

#[test]
fn test_groups_bracketed_only_with_several_items() {
    let query = factory().select();
    let person = query.from("Person").unwrap();

    let adult = query
        .where_(person.get_i64("getAge").unwrap())
        .unwrap()
        .gt(18)
        .unwrap();
    let names = query
        .condition(person.get_str("getName").unwrap())
        .unwrap()
        .eq("Ann")
        .unwrap()
        .or(person.get_str("getName").unwrap())
        .unwrap()
        .eq("Bob")
        .unwrap();
    adult.and_group(&names).unwrap();
    let single = query
        .condition(person.get_i64("getId").unwrap())
        .unwrap()
        .is_not_null()
        .unwrap();
    query.where_group(&single).unwrap();

    let statement = query.build().unwrap();
    assert_eq!(
        statement.text,
        "from Person person_0 where person_0.age > ? \
         and (person_0.name = ? or person_0.name = ?) and person_0.id is not null"
    );
    assert_eq!(
        statement.values(),
        vec![
            &Literal::Int(18),
            &Literal::Text("Ann".to_string()),
            &Literal::Text("Bob".to_string())
        ]
    );

    assert_eq!(adult.and_group(&adult).unwrap_err(), QueryError::InvalidGroup);
}

#[test]
fn test_aggregates_grouping_and_ordering() {
    let query = factory().select();
    let person = query.from("Person").unwrap();

    query.select(person.get_str("getName").unwrap()).unwrap();
    query
        .select(query.count(person.get_i64("getId").unwrap()).unwrap())
        .unwrap();
    query.group_by(person.get_str("getName").unwrap()).unwrap();
    query
        .having(query.count(person.get_i64("getId").unwrap()).unwrap())
        .unwrap()
        .gt(1)
        .unwrap();
    query.order_by_desc(person.get_str("getName").unwrap()).unwrap();

    assert_eq!(
        query.build().unwrap().text,
        "select person_0.name, count(person_0.id) from Person person_0 \
         group by person_0.name having count(person_0.id) > ? order by person_0.name desc"
    );
}

#[test]
fn test_expressions_render_recursively() {
    let query = factory().select();
    let person = query.from("Person").unwrap();

    let condition = query
        .condition(person.get_i64("getAge").unwrap())
        .unwrap()
        .lt(18)
        .unwrap();
    let case = query
        .case_when(&condition, "minor")
        .unwrap()
        .otherwise("adult")
        .unwrap();
    query.select(case).unwrap();

    let span = query.minus(10, 3).unwrap();
    query
        .select(query.minus(person.get_i64("getAge").unwrap(), span).unwrap())
        .unwrap();
    query
        .select(query.concat(vec![person.get_str("getName").unwrap().into(), "!".into()]).unwrap())
        .unwrap();
    query
        .select(query.count_distinct(query.lower(person.get_str("getName").unwrap()).unwrap()).unwrap())
        .unwrap();
    query.select_distinct().unwrap();

    let statement = query.build().unwrap();
    assert_eq!(
        statement.text,
        "select distinct case when person_0.age < ? then ? else ? end, \
         person_0.age - (? - ?), concat(person_0.name, ?), count(distinct lower(person_0.name)) \
         from Person person_0"
    );
    assert_eq!(statement.params.len(), 6);
}

#[test]
fn test_metadata_consulted_once_per_path() {
    let provider = Arc::new(CountingProvider::new());
    let factory = QueryFactory::new(provider.clone());
    let query = factory.select();
    let person = query.from("Person").unwrap();

    for _ in 0..3 {
        let name = person.navigate("getSpouse").unwrap().get_str("getName").unwrap();
        query.select(name).unwrap();
    }
    assert_eq!(provider.resolved(), 2);
}

#[test]
fn test_handle_invocation_bypasses_queue() {
    let query = factory().select();
    let person = query.from("Person").unwrap();

    let result = person
        .intercept(Invocation::new("getHandle", ReturnKind::Handle))
        .unwrap();
    match result {
        InterceptionResult::Handle(node) => assert_eq!(node, person.handle()),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(query.pending_navigations(), 0);
}

#[test]
fn test_statement_serializes_to_json() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    query
        .where_(person.get_str("getName").unwrap())
        .unwrap()
        .like("A%")
        .unwrap();

    let json = serde_json::to_value(query.build().unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "text": "from Person person_0 where person_0.name like ?",
            "params": [{ "placeholder": "?", "value": "A%" }]
        })
    );
}

#[test]
fn test_build_requires_from() {
    let query = factory().select();
    assert_eq!(query.build().unwrap_err(), QueryError::MissingFrom);
}

#[test]
fn test_named_style_reserves_generated_placeholders() {
    let config = BuilderConfig {
        param_style: ParamStyle::Named,
        ..Default::default()
    };
    let query = factory_with(config).select();
    let person = query.from("Person").unwrap();

    assert!(matches!(
        query.param("p1", "Bob"),
        Err(QueryError::ReservedParamName { .. })
    ));
    let name = query.param("name", "Bob").unwrap();
    query
        .where_(person.get_i64("getAge").unwrap())
        .unwrap()
        .gt(50)
        .unwrap()
        .and(person.get_str("getName").unwrap())
        .unwrap()
        .eq(name)
        .unwrap();

    let statement = query.build().unwrap();
    assert_eq!(
        statement.text,
        "from Person person_0 where person_0.age > :p1 and person_0.name = :name"
    );
    let placeholders: Vec<&str> = statement
        .params
        .iter()
        .map(|p| p.placeholder.as_str())
        .collect();
    assert_eq!(placeholders, vec![":p1", ":name"]);

    let positional = factory().select();
    assert!(positional.param("p1", 1).is_ok());
}

#[test]
fn test_copy_rejects_handles_of_the_original() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let sub = query.subquery().unwrap();
    sub.from("Person").unwrap();

    let copy = query.copy();
    assert_eq!(copy.select(&person).unwrap_err(), QueryError::ForeignQuery);
    assert_eq!(copy.exists(&sub).unwrap_err(), QueryError::ForeignQuery);

    let copied_person = copy.rebind(&person).unwrap();
    let copied_sub = copy.rebind_query(&sub).unwrap();
    copy.select(&copied_person).unwrap();
    copy.exists(&copied_sub).unwrap();
    assert_eq!(
        copy.build().unwrap().text,
        "select person_0 from Person person_0 where exists (select person_1 from Person person_1)"
    );

    let unrelated = factory().select();
    let unrelated_person = unrelated.from("Person").unwrap();
    assert_eq!(
        copy.rebind(&unrelated_person).unwrap_err(),
        QueryError::ForeignQuery
    );
    assert!(query.build().is_ok());
}
