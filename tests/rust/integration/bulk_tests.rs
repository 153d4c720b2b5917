//! Update and delete statements.

use proxyql::{ErrorKind, Literal, QueryError};

use super::fixtures::factory;

#[test]
fn test_update_renders_assignments_before_where() -> anyhow::Result<()> {
    let query = factory().update();
    let person = query.from("Person")?;

    person.set("setName", "Bob")?;
    let older = query.plus(person.get_i64("getAge")?, 1)?;
    person.set("setAge", older)?;
    query.where_(person.get_i64("getId")?)?.eq(7)?;

    let statement = query.build()?;
    assert_eq!(
        statement.text,
        "update Person set name = ?, age = age + ? where id = ?"
    );
    assert_eq!(
        statement.values(),
        vec![
            &Literal::Text("Bob".to_string()),
            &Literal::Int(1),
            &Literal::Int(7)
        ]
    );
    Ok(())
}

#[test]
fn test_update_without_assignment_fails() {
    let query = factory().update();
    query.from("Person").unwrap();
    let err = query.build().unwrap_err();
    assert_eq!(err, QueryError::EmptyUpdate);
    assert_eq!(err.kind(), ErrorKind::StructuralMisuse);
}

#[test]
fn test_setter_outside_update_fails() {
    let query = factory().select();
    let person = query.from("Person").unwrap();
    let err = person.set("setName", "Bob").unwrap_err();
    assert_eq!(
        err,
        QueryError::SetterOutsideUpdate {
            path: "Person.name".to_string()
        }
    );
}

#[test]
fn test_delete_through_root_identifier_chain() -> anyhow::Result<()> {
    let query = factory().delete();
    let person = query.from("Person")?;

    query
        .where_(person.navigate("getSpouse")?.get_i64("getId")?)?
        .eq(3)?;

    assert_eq!(
        query.build()?.text,
        "delete from Person where spouse.id = ?"
    );
    Ok(())
}

#[test]
fn test_delete_rejects_joins() {
    let query = factory().delete();
    let person = query.from("Person").unwrap();
    let spouse = person.navigate("getSpouse").unwrap();

    let err = spouse.get_str("getName").unwrap_err();
    assert_eq!(
        err,
        QueryError::BulkJoin {
            path: "Person.spouse.name".to_string()
        }
    );
    assert_eq!(err.kind(), ErrorKind::StructuralMisuse);

    assert!(matches!(
        query.inner_join(&spouse),
        Err(QueryError::ClauseNotSupported { .. })
    ));
    assert!(matches!(
        query.join_chain(proxyql::JoinType::Left),
        Err(QueryError::ClauseNotSupported { .. })
    ));
}

#[test]
fn test_bulk_statements_reject_projection_clauses() {
    let query = factory().update();
    let person = query.from("Person").unwrap();
    assert!(matches!(
        query.select(person.get_str("getName").unwrap()),
        Err(QueryError::ClauseNotSupported { .. })
    ));
    assert!(matches!(
        factory().delete().select_distinct(),
        Err(QueryError::ClauseNotSupported { .. })
    ));
}

#[test]
fn test_delete_with_subquery() -> anyhow::Result<()> {
    let query = factory().delete();
    let person = query.from("Person")?;

    let sub = query.subquery()?;
    let relation = sub.from("Relation")?;
    sub.select(relation.navigate("getChild")?.get_i64("getId")?)?;

    query.where_(person.get_i64("getId")?)?.in_subquery(&sub)?;

    assert_eq!(
        query.build()?.text,
        "delete from Person where id in (select relation_0.child.id from Relation relation_0)"
    );
    Ok(())
}

#[test]
fn test_update_second_root_rejected() {
    let query = factory().update();
    query.from("Person").unwrap();
    assert_eq!(
        query.from("Relation").unwrap_err(),
        QueryError::SecondBulkRoot {
            kind: "update".to_string(),
            entity: "Relation".to_string()
        }
    );
}
