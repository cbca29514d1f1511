//! Holding companies, subsidiaries and divisions.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::{date_at, date_text, now, opt_date_at, time_at, time_text, uuid_at, Storage};
use crate::error::{Error, Result};
use crate::model::{Division, DivisionScope, HoldingCompany, NewDivision, Subsidiary};

const DIVISION_COLUMNS: &str =
    "id, name, subsidiary_id, strategic_plan, start_date, end_date, created_at, updated_at";

impl Storage {
    /// Insert a holding company.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_holding_company(&self, name: &str) -> Result<HoldingCompany> {
        insert_holding_company(&*self.conn()?, name)
    }

    /// Get a holding company by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_holding_company(&self, id: Uuid) -> Result<Option<HoldingCompany>> {
        let company = self
            .conn()?
            .query_row(
                "SELECT id, name, created_at, updated_at FROM holding_companies WHERE id = ?1",
                [id.to_string()],
                row_to_holding_company,
            )
            .optional()?;
        Ok(company)
    }

    /// All holding companies by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_holding_companies(&self) -> Result<Vec<HoldingCompany>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, created_at, updated_at FROM holding_companies ORDER BY name",
        )?;
        let companies = stmt
            .query_map([], row_to_holding_company)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(companies)
    }

    /// Insert a subsidiary under an existing holding company.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent does not exist or the query fails.
    pub fn insert_subsidiary(&self, name: &str, holding_company_id: Uuid) -> Result<Subsidiary> {
        insert_subsidiary(&*self.conn()?, name, holding_company_id)
    }

    /// Get a subsidiary by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_subsidiary(&self, id: Uuid) -> Result<Option<Subsidiary>> {
        let subsidiary = self
            .conn()?
            .query_row(
                r"
                SELECT id, name, holding_company_id, created_at, updated_at
                FROM subsidiaries WHERE id = ?1
                ",
                [id.to_string()],
                row_to_subsidiary,
            )
            .optional()?;
        Ok(subsidiary)
    }

    /// Subsidiaries, optionally limited to one holding company.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_subsidiaries(&self, holding_company_id: Option<Uuid>) -> Result<Vec<Subsidiary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT id, name, holding_company_id, created_at, updated_at
            FROM subsidiaries
            WHERE ?1 IS NULL OR holding_company_id = ?1
            ORDER BY name
            ",
        )?;
        let subsidiaries = stmt
            .query_map(
                [holding_company_id.map(|id| id.to_string())],
                row_to_subsidiary,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subsidiaries)
    }

    /// Insert a division under an existing subsidiary.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent does not exist or the query fails.
    pub fn insert_division(&self, new: &NewDivision) -> Result<Division> {
        insert_division(&*self.conn()?, new)
    }

    /// Get a division by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_division(&self, id: Uuid) -> Result<Option<Division>> {
        fetch_division(&*self.conn()?, id)
    }

    /// All divisions by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_divisions(&self) -> Result<Vec<Division>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DIVISION_COLUMNS} FROM divisions ORDER BY name"
        ))?;
        let divisions = stmt
            .query_map([], row_to_division)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(divisions)
    }

    /// Replace a division's strategic plan.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the division does not exist.
    pub fn set_strategic_plan(&self, id: Uuid, plan: Option<&str>) -> Result<Division> {
        set_strategic_plan(&*self.conn()?, id, plan)
    }

    /// The division's place in the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn division_scope(&self, division_id: Uuid) -> Result<Option<DivisionScope>> {
        let scope = self
            .conn()?
            .query_row(
                r"
                SELECT d.id, s.id, s.holding_company_id
                FROM divisions d JOIN subsidiaries s ON s.id = d.subsidiary_id
                WHERE d.id = ?1
                ",
                [division_id.to_string()],
                |row| {
                    Ok(DivisionScope {
                        division_id: uuid_at(row, 0)?,
                        subsidiary_id: uuid_at(row, 1)?,
                        holding_company_id: uuid_at(row, 2)?,
                    })
                },
            )
            .optional()?;
        Ok(scope)
    }
}

pub(crate) fn insert_holding_company(conn: &Connection, name: &str) -> Result<HoldingCompany> {
    let company = HoldingCompany {
        id: Uuid::new_v4(),
        name: name.to_string(),
        created_at: now(),
        updated_at: now(),
    };
    conn.execute(
        "INSERT INTO holding_companies (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            company.id.to_string(),
            company.name,
            time_text(company.created_at),
            time_text(company.updated_at),
        ],
    )?;
    debug!("Inserted holding company {}", company.id);
    Ok(company)
}

pub(crate) fn insert_subsidiary(
    conn: &Connection,
    name: &str,
    holding_company_id: Uuid,
) -> Result<Subsidiary> {
    let subsidiary = Subsidiary {
        id: Uuid::new_v4(),
        name: name.to_string(),
        holding_company_id,
        created_at: now(),
        updated_at: now(),
    };
    conn.execute(
        r"
        INSERT INTO subsidiaries (id, name, holding_company_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
        params![
            subsidiary.id.to_string(),
            subsidiary.name,
            holding_company_id.to_string(),
            time_text(subsidiary.created_at),
            time_text(subsidiary.updated_at),
        ],
    )?;
    debug!("Inserted subsidiary {}", subsidiary.id);
    Ok(subsidiary)
}

pub(crate) fn insert_division(conn: &Connection, new: &NewDivision) -> Result<Division> {
    let division = Division {
        id: Uuid::new_v4(),
        name: new.name.clone(),
        subsidiary_id: new.subsidiary_id,
        strategic_plan: new.strategic_plan.clone(),
        start_date: new.start_date,
        end_date: new.end_date,
        created_at: now(),
        updated_at: now(),
    };
    conn.execute(
        &format!("INSERT INTO divisions ({DIVISION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        params![
            division.id.to_string(),
            division.name,
            division.subsidiary_id.to_string(),
            division.strategic_plan,
            date_text(division.start_date),
            division.end_date.map(date_text),
            time_text(division.created_at),
            time_text(division.updated_at),
        ],
    )?;
    debug!("Inserted division {}", division.id);
    Ok(division)
}

pub(crate) fn set_strategic_plan(
    conn: &Connection,
    id: Uuid,
    plan: Option<&str>,
) -> Result<Division> {
    let affected = conn.execute(
        "UPDATE divisions SET strategic_plan = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), plan, time_text(now())],
    )?;
    if affected == 0 {
        return Err(Error::not_found("divisions", id));
    }
    fetch_division(conn, id)?.ok_or_else(|| Error::not_found("divisions", id))
}

fn fetch_division(conn: &Connection, id: Uuid) -> Result<Option<Division>> {
    let division = conn
        .query_row(
            &format!("SELECT {DIVISION_COLUMNS} FROM divisions WHERE id = ?1"),
            [id.to_string()],
            row_to_division,
        )
        .optional()?;
    Ok(division)
}

fn row_to_holding_company(row: &Row<'_>) -> rusqlite::Result<HoldingCompany> {
    Ok(HoldingCompany {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        created_at: time_at(row, 2)?,
        updated_at: time_at(row, 3)?,
    })
}

fn row_to_subsidiary(row: &Row<'_>) -> rusqlite::Result<Subsidiary> {
    Ok(Subsidiary {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        holding_company_id: uuid_at(row, 2)?,
        created_at: time_at(row, 3)?,
        updated_at: time_at(row, 4)?,
    })
}

fn row_to_division(row: &Row<'_>) -> rusqlite::Result<Division> {
    Ok(Division {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        subsidiary_id: uuid_at(row, 2)?,
        strategic_plan: row.get(3)?,
        start_date: date_at(row, 4)?,
        end_date: opt_date_at(row, 5)?,
        created_at: time_at(row, 6)?,
        updated_at: time_at(row, 7)?,
    })
}
