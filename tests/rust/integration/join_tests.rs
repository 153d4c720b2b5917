//! Join-type resolution as seen in rendered statements.

use proxyql::{BuilderConfig, ErrorKind, JoinType, QueryError};

use super::fixtures::{factory, factory_with};

#[test]
fn test_left_join_propagates_to_children() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let spouse = query.left_join(person.navigate("getSpouse").unwrap()).unwrap();
    let spouse_of_spouse = spouse.navigate("getSpouse").unwrap();

    query
        .select(spouse_of_spouse.get_str("getName").unwrap())
        .unwrap();

    assert_eq!(
        query.build().unwrap().text,
        "select person_2.name from Person person_0 \
         left join person_0.spouse person_1 left join person_1.spouse person_2"
    );
}

#[test]
fn test_explicit_join_overrides_inherited_left() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let spouse = query.left_join(person.navigate("getSpouse").unwrap()).unwrap();
    let inner = query.inner_join(spouse.navigate("getSpouse").unwrap()).unwrap();

    query.select(inner.get_str("getName").unwrap()).unwrap();

    assert_eq!(
        query.build().unwrap().text,
        "select person_2.name from Person person_0 \
         left join person_0.spouse person_1 inner join person_1.spouse person_2"
    );
}

#[test]
fn test_fetch_join_without_reads() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    query.fetch_join(person.navigate("getSpouse").unwrap()).unwrap();
    query
        .left_fetch_join(person.get_collection("getChildren").unwrap())
        .unwrap();

    assert_eq!(
        query.build().unwrap().text,
        "from Person person_0 inner join fetch person_0.spouse person_1 \
         left join fetch person_0.children person_2"
    );
}

#[test]
fn test_collection_joined_only_when_read_through() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    query
        .where_(person.get_collection("getChildren").unwrap())
        .unwrap()
        .is_not_empty()
        .unwrap();
    assert_eq!(
        query.build().unwrap().text,
        "from Person person_0 where person_0.children is not empty"
    );

    let query = factory().select();
    let person = query.from("Person").unwrap();
    let child = query
        .inner_join(person.get_collection("getChildren").unwrap())
        .unwrap();
    query.select(child.get_str("getName").unwrap()).unwrap();
    assert_eq!(
        query.build().unwrap().text,
        "select person_1.name from Person person_0 inner join person_0.children person_1"
    );
}

#[test]
fn test_embedded_paths_and_nested_association() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let address = person.navigate("getAddress").unwrap();

    query.select(address.get_str("getCity").unwrap()).unwrap();
    query
        .select(address.navigate("getCountry").unwrap().get_str("getName").unwrap())
        .unwrap();

    assert_eq!(
        query.build().unwrap().text,
        "select person_0.address.city, country_1.name from Person person_0 \
         inner join person_0.address.country country_1"
    );
}

#[test]
fn test_join_elision_can_be_disabled() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    query
        .select(person.navigate("getSpouse").unwrap().get_i64("getId").unwrap())
        .unwrap();
    assert_eq!(
        query.build().unwrap().text,
        "select person_0.spouse.id from Person person_0"
    );

    let config = BuilderConfig {
        join_elision: false,
        ..Default::default()
    };
    let query = factory_with(config).select();
    let person = query.from("Person").unwrap();
    query
        .select(person.navigate("getSpouse").unwrap().get_i64("getId").unwrap())
        .unwrap();
    assert_eq!(
        query.build().unwrap().text,
        "select person_1.id from Person person_0 inner join person_0.spouse person_1"
    );
}

#[test]
fn test_join_chain_applies_type_to_every_hop() {
    let query = factory().select();
    let person = query.from("Person").unwrap();

    let armed = query.join_chain(JoinType::Left).unwrap();
    assert_eq!(armed.join_type(), JoinType::Left);
    let target = armed
        .join(person.navigate("getSpouse").unwrap().navigate("getSpouse").unwrap())
        .unwrap();

    query.select(target.get_str("getName").unwrap()).unwrap();
    assert_eq!(
        query.build().unwrap().text,
        "select person_2.name from Person person_0 \
         left join person_0.spouse person_1 left join person_1.spouse person_2"
    );
}

#[test]
fn test_armed_join_rejects_other_calls() {
    let query = factory().select();
    let person = query.from("Person").unwrap();

    let armed = query.join_chain(JoinType::Inner).unwrap();
    let err = query.select(person.get_i64("getAge").unwrap()).unwrap_err();
    assert!(matches!(err, QueryError::ArmedJoinPending { .. }));
    assert_eq!(err.kind(), ErrorKind::StructuralMisuse);

    let err = armed
        .join(person.navigate("getSpouse").unwrap())
        .unwrap_err();
    assert_eq!(err, QueryError::StaleJoinHandle);
}

#[test]
fn test_second_chain_invalidates_first() {
    let query = factory().select();
    let person = query.from("Person").unwrap();

    let first = query.join_chain(JoinType::Inner).unwrap();
    assert!(query.join_chain(JoinType::Left).is_err());
    assert_eq!(
        first.join(person.navigate("getSpouse").unwrap()).unwrap_err(),
        QueryError::StaleJoinHandle
    );
    assert!(query.build().is_ok());
}

#[test]
fn test_with_clause_on_explicit_join() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let spouse = query.left_join(person.navigate("getSpouse").unwrap()).unwrap();

    query
        .with(&spouse, spouse.get_i64("getAge").unwrap())
        .unwrap()
        .gt(30)
        .unwrap();

    let statement = query.build().unwrap();
    assert_eq!(
        statement.text,
        "from Person person_0 left join person_0.spouse person_1 with person_1.age > ?"
    );
    assert_eq!(statement.params.len(), 1);
}

#[test]
fn test_with_requires_explicit_join() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let spouse = person.navigate("getSpouse").unwrap();

    let err = query.with(&spouse, 1).unwrap_err();
    assert_eq!(
        err,
        QueryError::WithoutJoin {
            path: "Person.spouse".to_string()
        }
    );
}

#[test]
fn test_join_type_frozen_by_earlier_build() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let spouse = person.navigate("getSpouse").unwrap();
    query.select(spouse.get_i64("getId").unwrap()).unwrap();
    let first = query.build().unwrap();

    let err = query.left_join(&spouse).unwrap_err();
    assert!(matches!(err, QueryError::JoinTypeConflict { .. }));
    assert_eq!(query.build().unwrap(), first);
}

#[test]
fn test_joining_a_basic_property_fails() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let err = query.inner_join(person.get_str("getName").unwrap()).unwrap_err();
    assert_eq!(
        err,
        QueryError::NotJoinable {
            path: "Person.name".to_string()
        }
    );
}

#[test]
fn test_armed_join_rejects_params_and_case_completion() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let minor = query
        .condition(person.get_i64("getAge").unwrap())
        .unwrap()
        .lt(18)
        .unwrap();
    let with_default = query.case_when(&minor, "minor").unwrap();
    let without_default = query.case_when(&minor, "minor").unwrap();

    let armed = query.join_chain(JoinType::Left).unwrap();
    assert!(matches!(
        query.param("min", 18),
        Err(QueryError::ArmedJoinPending { .. })
    ));
    assert_eq!(
        armed.join(person.navigate("getSpouse").unwrap()).unwrap_err(),
        QueryError::StaleJoinHandle
    );

    let armed = query.join_chain(JoinType::Left).unwrap();
    assert!(matches!(
        with_default.otherwise("adult"),
        Err(QueryError::ArmedJoinPending { .. })
    ));
    assert_eq!(
        armed.join(person.navigate("getSpouse").unwrap()).unwrap_err(),
        QueryError::StaleJoinHandle
    );

    let armed = query.join_chain(JoinType::Left).unwrap();
    assert!(matches!(
        without_default.end(),
        Err(QueryError::ArmedJoinPending { .. })
    ));
    assert_eq!(
        armed.join(person.navigate("getSpouse").unwrap()).unwrap_err(),
        QueryError::StaleJoinHandle
    );
}
