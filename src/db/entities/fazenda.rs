//! Parcel entity
//!
//! The `geom` column is not mapped here: it is read as GeoJSON text through
//! `ST_AsGeoJSON` and written with `ST_GeomFromGeoJSON`, see
//! [`crate::parcels`] and [`crate::seed`].

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fazendas")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub cod_tema: Option<String>,
    pub nom_tema: Option<String>,
    pub cod_imovel: Option<String>,
    pub mod_fiscal: Option<f64>,
    pub num_area: Option<f64>,
    pub ind_status: Option<String>,
    pub ind_tipo: Option<String>,
    pub des_condic: Option<String>,
    pub municipio: Option<String>,
    pub cod_estado: Option<String>,
    pub dat_criaca: Option<Date>,
    pub dat_atuali: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
