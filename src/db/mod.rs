//! Database module for PostgreSQL/PostGIS persistence using SeaORM

pub mod entities;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement,
};

use crate::config::DatabaseConfig;

/// Open the connection pool shared by every request.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to database"
    );

    Database::connect(options).await
}

/// Round-trip a trivial statement to prove the pool can reach the server.
pub async fn ping<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "SELECT 1".to_string(),
    ))
    .await?;
    Ok(())
}

/// Create the PostGIS extension, tables and indexes if they don't exist
pub async fn create_tables<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    db.execute(Statement::from_string(
        backend,
        "CREATE EXTENSION IF NOT EXISTS postgis".to_string(),
    ))
    .await?;

    // Parcels table
    db.execute(Statement::from_string(
        backend,
        r#"
        CREATE TABLE IF NOT EXISTS fazendas (
            id SERIAL PRIMARY KEY,
            cod_tema VARCHAR,
            nom_tema VARCHAR,
            cod_imovel VARCHAR,
            mod_fiscal DOUBLE PRECISION,
            num_area DOUBLE PRECISION,
            ind_status VARCHAR,
            ind_tipo VARCHAR,
            des_condic VARCHAR,
            municipio VARCHAR,
            cod_estado VARCHAR(2),
            dat_criaca DATE,
            dat_atuali DATE,
            geom geometry(MULTIPOLYGON, 4326) NOT NULL,
            CONSTRAINT ck_fazendas_num_area_positive CHECK (num_area >= 0)
        )
        "#
        .to_string(),
    ))
    .await?;

    db.execute(Statement::from_string(
        backend,
        r#"CREATE INDEX IF NOT EXISTS idx_fazendas_geom ON fazendas USING gist (geom)"#.to_string(),
    ))
    .await?;
    db.execute(Statement::from_string(
        backend,
        r#"CREATE INDEX IF NOT EXISTS ix_fazendas_nom_tema ON fazendas(nom_tema)"#.to_string(),
    ))
    .await?;
    db.execute(Statement::from_string(
        backend,
        r#"CREATE INDEX IF NOT EXISTS ix_fazendas_municipio ON fazendas(municipio)"#.to_string(),
    ))
    .await?;
    db.execute(Statement::from_string(
        backend,
        r#"CREATE INDEX IF NOT EXISTS ix_fazendas_cod_estado ON fazendas(cod_estado)"#.to_string(),
    ))
    .await?;

    // Seed ledger
    db.execute(Statement::from_string(
        backend,
        r#"
        CREATE TABLE IF NOT EXISTS seed_control (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            executed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CONSTRAINT uq_seed_control_name UNIQUE (name)
        )
        "#
        .to_string(),
    ))
    .await?;

    db.execute(Statement::from_string(
        backend,
        r#"CREATE INDEX IF NOT EXISTS idx_seed_control_name ON seed_control(name)"#.to_string(),
    ))
    .await?;

    tracing::info!("Database schema ready");
    Ok(())
}
