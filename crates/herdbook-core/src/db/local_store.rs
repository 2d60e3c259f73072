//! Local store implementation
//!
//! `LocalStore` is the engine-facing interface to the device's database.
//! `LibSqlLocalStore` is the only place that knows the foreign-key
//! deletion/insertion order for wholesale replacement.

use chrono::NaiveDate;
use libsql::{params, Connection};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::{
    Animal, AnimalId, BreedingEvent, CalvingEvent, FarmContact, FarmSettings, HealthEvent, Herd,
    HerdAssignment, Photo, WeightRecord,
};

/// The definitive replacement set produced by a sync merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FarmSnapshot {
    pub herds: Vec<Herd>,
    pub animals: Vec<Animal>,
    pub herd_assignments: Vec<HerdAssignment>,
    pub breeding_events: Vec<BreedingEvent>,
    pub calving_events: Vec<CalvingEvent>,
    pub health_events: Vec<HealthEvent>,
    pub weight_records: Vec<WeightRecord>,
    pub photos: Vec<Photo>,
}

impl FarmSnapshot {
    /// Total records across all collections.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.herds.len()
            + self.animals.len()
            + self.herd_assignments.len()
            + self.breeding_events.len()
            + self.calving_events.len()
            + self.health_events.len()
            + self.weight_records.len()
            + self.photos.len()
    }
}

/// Local persistence operations consumed by the sync engine (async)
#[allow(async_fn_in_trait)]
pub trait LocalStore {
    /// Read the full animals table
    async fn animals(&self) -> Result<Vec<Animal>>;

    /// Read the full herds table
    async fn herds(&self) -> Result<Vec<Herd>>;

    /// Read the full herd assignments table
    async fn herd_assignments(&self) -> Result<Vec<HerdAssignment>>;

    /// Read the full breeding events table
    async fn breeding_events(&self) -> Result<Vec<BreedingEvent>>;

    /// Read the full calving events table
    async fn calving_events(&self) -> Result<Vec<CalvingEvent>>;

    /// Read the full health events table
    async fn health_events(&self) -> Result<Vec<HealthEvent>>;

    /// Read the full weight records table
    async fn weight_records(&self) -> Result<Vec<WeightRecord>>;

    /// Read the full photos table
    async fn photos(&self) -> Result<Vec<Photo>>;

    /// Load the farm settings singleton, if one has been saved
    async fn load_settings(&self) -> Result<Option<FarmSettings>>;

    /// Save the farm settings singleton
    async fn save_settings(&self, settings: &FarmSettings) -> Result<()>;

    /// Atomically replace every record collection with the given snapshot.
    ///
    /// Deletes children before parents, inserts parents before children, in
    /// a single transaction, so no child row is ever visible without its
    /// parent. Farm settings and sync metadata are untouched.
    async fn replace_all(&self, snapshot: FarmSnapshot) -> Result<()>;

    /// Read a sync metadata value
    async fn get_meta(&self, key: &str) -> Result<Option<String>>;

    /// Write a sync metadata value
    async fn set_meta(&self, key: &str, value: &str) -> Result<()>;
}

/// libSQL implementation of `LocalStore`
pub struct LibSqlLocalStore {
    conn: Connection,
}

impl LibSqlLocalStore {
    /// Create a store over the given connection
    #[must_use]
    pub const fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Insert a single animal (editing-layer operation)
    pub async fn insert_animal(&self, animal: &Animal) -> Result<()> {
        insert_animal(&self.conn, animal).await
    }

    /// Get an animal by ID
    pub async fn animal_by_id(&self, id: &AnimalId) -> Result<Option<Animal>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, ear_tag, sex, breed, date_of_birth, herd_id, status, created_at, updated_at
                 FROM animals WHERE id = ?",
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(animal_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Insert a single herd (editing-layer operation)
    pub async fn insert_herd(&self, herd: &Herd) -> Result<()> {
        insert_herd(&self.conn, herd).await
    }

    /// Insert a single herd assignment (editing-layer operation)
    pub async fn insert_herd_assignment(&self, assignment: &HerdAssignment) -> Result<()> {
        insert_herd_assignment(&self.conn, assignment).await
    }

    /// Insert a single breeding event (editing-layer operation)
    pub async fn insert_breeding_event(&self, event: &BreedingEvent) -> Result<()> {
        insert_breeding_event(&self.conn, event).await
    }

    /// Insert a single calving event (editing-layer operation)
    pub async fn insert_calving_event(&self, event: &CalvingEvent) -> Result<()> {
        insert_calving_event(&self.conn, event).await
    }

    /// Insert a single health event (editing-layer operation)
    pub async fn insert_health_event(&self, event: &HealthEvent) -> Result<()> {
        insert_health_event(&self.conn, event).await
    }

    /// Insert a single weight record (editing-layer operation)
    pub async fn insert_weight_record(&self, record: &WeightRecord) -> Result<()> {
        insert_weight_record(&self.conn, record).await
    }

    /// Insert a single photo (editing-layer operation)
    pub async fn insert_photo(&self, photo: &Photo) -> Result<()> {
        insert_photo(&self.conn, photo).await
    }

    async fn apply_replacement(&self, snapshot: &FarmSnapshot) -> Result<()> {
        // Children out first, parents in first
        for table in [
            "photos",
            "weight_records",
            "health_events",
            "calving_events",
            "breeding_events",
            "herd_assignments",
            "animals",
            "herds",
        ] {
            self.conn
                .execute(&format!("DELETE FROM {table}"), ())
                .await?;
        }

        for herd in &snapshot.herds {
            insert_herd(&self.conn, herd).await?;
        }
        for animal in &snapshot.animals {
            insert_animal(&self.conn, animal).await?;
        }
        for assignment in &snapshot.herd_assignments {
            insert_herd_assignment(&self.conn, assignment).await?;
        }
        for event in &snapshot.breeding_events {
            insert_breeding_event(&self.conn, event).await?;
        }
        for event in &snapshot.calving_events {
            insert_calving_event(&self.conn, event).await?;
        }
        for event in &snapshot.health_events {
            insert_health_event(&self.conn, event).await?;
        }
        for record in &snapshot.weight_records {
            insert_weight_record(&self.conn, record).await?;
        }
        for photo in &snapshot.photos {
            insert_photo(&self.conn, photo).await?;
        }

        Ok(())
    }
}

impl LocalStore for LibSqlLocalStore {
    async fn animals(&self) -> Result<Vec<Animal>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, ear_tag, sex, breed, date_of_birth, herd_id, status, created_at, updated_at
                 FROM animals ORDER BY ear_tag",
                (),
            )
            .await?;

        let mut animals = Vec::new();
        while let Some(row) = rows.next().await? {
            animals.push(animal_from_row(&row)?);
        }
        Ok(animals)
    }

    async fn herds(&self) -> Result<Vec<Herd>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, sort_order, created_at FROM herds ORDER BY sort_order, name",
                (),
            )
            .await?;

        let mut herds = Vec::new();
        while let Some(row) = rows.next().await? {
            herds.push(Herd {
                id: parse_id(&row.get::<String>(0)?, "herd")?,
                name: row.get(1)?,
                sort_order: row.get(2)?,
                created_at: row.get(3)?,
            });
        }
        Ok(herds)
    }

    async fn herd_assignments(&self) -> Result<Vec<HerdAssignment>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, animal_id, herd_id, assigned_at, removed_at FROM herd_assignments",
                (),
            )
            .await?;

        let mut assignments = Vec::new();
        while let Some(row) = rows.next().await? {
            assignments.push(HerdAssignment {
                id: parse_id(&row.get::<String>(0)?, "herd assignment")?,
                animal_id: parse_id(&row.get::<String>(1)?, "animal")?,
                herd_id: parse_id(&row.get::<String>(2)?, "herd")?,
                assigned_at: parse_date(&row.get::<String>(3)?)?,
                removed_at: parse_date_option(row.get::<Option<String>>(4)?)?,
            });
        }
        Ok(assignments)
    }

    async fn breeding_events(&self) -> Result<Vec<BreedingEvent>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, animal_id, sire_ids, method, service_date, preg_check_date,
                        preg_check_result, created_at
                 FROM breeding_events ORDER BY service_date",
                (),
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(BreedingEvent {
                id: parse_id(&row.get::<String>(0)?, "breeding event")?,
                animal_id: parse_id(&row.get::<String>(1)?, "animal")?,
                sire_ids: serde_json::from_str(&row.get::<String>(2)?)?,
                method: row.get::<String>(3)?.parse()?,
                service_date: parse_date(&row.get::<String>(4)?)?,
                preg_check_date: parse_date_option(row.get::<Option<String>>(5)?)?,
                preg_check_result: row
                    .get::<Option<String>>(6)?
                    .map(|value| value.parse())
                    .transpose()?,
                created_at: row.get(7)?,
            });
        }
        Ok(events)
    }

    async fn calving_events(&self) -> Result<Vec<CalvingEvent>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, dam_id, calf_id, breeding_event_id, calving_date, assisted,
                        calf_sex, birth_weight_kg
                 FROM calving_events ORDER BY calving_date",
                (),
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(CalvingEvent {
                id: parse_id(&row.get::<String>(0)?, "calving event")?,
                dam_id: parse_id(&row.get::<String>(1)?, "animal")?,
                calf_id: row
                    .get::<Option<String>>(2)?
                    .map(|value| parse_id(&value, "animal"))
                    .transpose()?,
                breeding_event_id: parse_id(&row.get::<String>(3)?, "breeding event")?,
                calving_date: parse_date(&row.get::<String>(4)?)?,
                assisted: row.get::<i32>(5)? != 0,
                calf_sex: row
                    .get::<Option<String>>(6)?
                    .map(|value| value.parse())
                    .transpose()?,
                birth_weight_kg: row.get(7)?,
            });
        }
        Ok(events)
    }

    async fn health_events(&self) -> Result<Vec<HealthEvent>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, animal_id, event_type, date, product, dosage, withdrawal_end
                 FROM health_events ORDER BY date",
                (),
            )
            .await?;

        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(HealthEvent {
                id: parse_id(&row.get::<String>(0)?, "health event")?,
                animal_id: parse_id(&row.get::<String>(1)?, "animal")?,
                event_type: row.get::<String>(2)?.parse()?,
                date: parse_date(&row.get::<String>(3)?)?,
                product: row.get(4)?,
                dosage: row.get(5)?,
                withdrawal_end: parse_date_option(row.get::<Option<String>>(6)?)?,
            });
        }
        Ok(events)
    }

    async fn weight_records(&self) -> Result<Vec<WeightRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, animal_id, date, weight_kg, note FROM weight_records ORDER BY date",
                (),
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(WeightRecord {
                id: parse_id(&row.get::<String>(0)?, "weight record")?,
                animal_id: parse_id(&row.get::<String>(1)?, "animal")?,
                date: parse_date(&row.get::<String>(2)?)?,
                weight_kg: row.get(3)?,
                note: row.get(4)?,
            });
        }
        Ok(records)
    }

    async fn photos(&self) -> Result<Vec<Photo>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, animal_id, angle, location, captured_at, latitude, longitude
                 FROM photos ORDER BY captured_at",
                (),
            )
            .await?;

        let mut photos = Vec::new();
        while let Some(row) = rows.next().await? {
            photos.push(Photo {
                id: parse_id(&row.get::<String>(0)?, "photo")?,
                animal_id: parse_id(&row.get::<String>(1)?, "animal")?,
                angle: row.get::<String>(2)?.parse()?,
                location: row.get(3)?,
                captured_at: row.get(4)?,
                latitude: row.get(5)?,
                longitude: row.get(6)?,
            });
        }
        Ok(photos)
    }

    async fn load_settings(&self) -> Result<Option<FarmSettings>> {
        let mut rows = self
            .conn
            .query(
                "SELECT farm_name, address, contacts, gestation_length_days, weaning_age_days,
                        breeding_alert_days, withdrawal_alert_days, updated_at
                 FROM farm_settings WHERE id = 1",
                (),
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let contacts: Vec<FarmContact> = serde_json::from_str(&row.get::<String>(2)?)?;
        Ok(Some(FarmSettings {
            farm_name: row.get(0)?,
            address: row.get(1)?,
            contacts,
            gestation_length_days: policy_value(row.get(3)?),
            weaning_age_days: policy_value(row.get(4)?),
            breeding_alert_days: policy_value(row.get(5)?),
            withdrawal_alert_days: policy_value(row.get(6)?),
            updated_at: row.get(7)?,
        }))
    }

    async fn save_settings(&self, settings: &FarmSettings) -> Result<()> {
        let contacts = serde_json::to_string(&settings.contacts)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO farm_settings
                 (id, farm_name, address, contacts, gestation_length_days, weaning_age_days,
                  breeding_alert_days, withdrawal_alert_days, updated_at)
                 VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    settings.farm_name.clone(),
                    settings.address.clone(),
                    contacts,
                    i64::from(settings.gestation_length_days),
                    i64::from(settings.weaning_age_days),
                    i64::from(settings.breeding_alert_days),
                    i64::from(settings.withdrawal_alert_days),
                    settings.updated_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn replace_all(&self, snapshot: FarmSnapshot) -> Result<()> {
        self.conn.execute("BEGIN TRANSACTION", ()).await?;

        if let Err(error) = self.apply_replacement(&snapshot).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(error);
        }

        self.conn.execute("COMMIT", ()).await?;
        Ok(())
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM sync_meta WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }
}

async fn insert_herd(conn: &Connection, herd: &Herd) -> Result<()> {
    conn.execute(
        "INSERT INTO herds (id, name, sort_order, created_at) VALUES (?, ?, ?, ?)",
        params![
            herd.id.as_str(),
            herd.name.clone(),
            herd.sort_order,
            herd.created_at
        ],
    )
    .await?;
    Ok(())
}

async fn insert_animal(conn: &Connection, animal: &Animal) -> Result<()> {
    conn.execute(
        "INSERT INTO animals
         (id, ear_tag, sex, breed, date_of_birth, herd_id, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            animal.id.as_str(),
            animal.ear_tag.clone(),
            animal.sex.as_str(),
            animal.breed.clone(),
            animal.date_of_birth.to_string(),
            animal.herd_id.map(|id| id.as_str()),
            animal.status.as_str(),
            animal.created_at,
            animal.updated_at,
        ],
    )
    .await?;
    Ok(())
}

async fn insert_herd_assignment(conn: &Connection, assignment: &HerdAssignment) -> Result<()> {
    conn.execute(
        "INSERT INTO herd_assignments (id, animal_id, herd_id, assigned_at, removed_at)
         VALUES (?, ?, ?, ?, ?)",
        params![
            assignment.id.as_str(),
            assignment.animal_id.as_str(),
            assignment.herd_id.as_str(),
            assignment.assigned_at.to_string(),
            assignment.removed_at.map(|date| date.to_string()),
        ],
    )
    .await?;
    Ok(())
}

async fn insert_breeding_event(conn: &Connection, event: &BreedingEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO breeding_events
         (id, animal_id, sire_ids, method, service_date, preg_check_date, preg_check_result, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            event.id.as_str(),
            event.animal_id.as_str(),
            serde_json::to_string(&event.sire_ids)?,
            event.method.as_str(),
            event.service_date.to_string(),
            event.preg_check_date.map(|date| date.to_string()),
            event.preg_check_result.map(|result| result.as_str()),
            event.created_at,
        ],
    )
    .await?;
    Ok(())
}

async fn insert_calving_event(conn: &Connection, event: &CalvingEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO calving_events
         (id, dam_id, calf_id, breeding_event_id, calving_date, assisted, calf_sex, birth_weight_kg)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            event.id.as_str(),
            event.dam_id.as_str(),
            event.calf_id.map(|id| id.as_str()),
            event.breeding_event_id.as_str(),
            event.calving_date.to_string(),
            i32::from(event.assisted),
            event.calf_sex.map(|sex| sex.as_str()),
            event.birth_weight_kg,
        ],
    )
    .await?;
    Ok(())
}

async fn insert_health_event(conn: &Connection, event: &HealthEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO health_events
         (id, animal_id, event_type, date, product, dosage, withdrawal_end)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            event.id.as_str(),
            event.animal_id.as_str(),
            event.event_type.as_str(),
            event.date.to_string(),
            event.product.clone(),
            event.dosage.clone(),
            event.withdrawal_end.map(|date| date.to_string()),
        ],
    )
    .await?;
    Ok(())
}

async fn insert_weight_record(conn: &Connection, record: &WeightRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO weight_records (id, animal_id, date, weight_kg, note)
         VALUES (?, ?, ?, ?, ?)",
        params![
            record.id.as_str(),
            record.animal_id.as_str(),
            record.date.to_string(),
            record.weight_kg,
            record.note.clone(),
        ],
    )
    .await?;
    Ok(())
}

async fn insert_photo(conn: &Connection, photo: &Photo) -> Result<()> {
    conn.execute(
        "INSERT INTO photos
         (id, animal_id, angle, location, captured_at, latitude, longitude)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            photo.id.as_str(),
            photo.animal_id.as_str(),
            photo.angle.as_str(),
            photo.location.clone(),
            photo.captured_at,
            photo.latitude,
            photo.longitude,
        ],
    )
    .await?;
    Ok(())
}

fn animal_from_row(row: &libsql::Row) -> Result<Animal> {
    Ok(Animal {
        id: parse_id(&row.get::<String>(0)?, "animal")?,
        ear_tag: row.get(1)?,
        sex: row.get::<String>(2)?.parse()?,
        breed: row.get(3)?,
        date_of_birth: parse_date(&row.get::<String>(4)?)?,
        herd_id: row
            .get::<Option<String>>(5)?
            .map(|value| parse_id(&value, "herd"))
            .transpose()?,
        status: row.get::<String>(6)?.parse()?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn policy_value(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn parse_id<T: FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Database(format!("invalid {what} id: {value}")))
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    value
        .parse()
        .map_err(|_| Error::Database(format!("invalid date: {value}")))
}

fn parse_date_option(value: Option<String>) -> Result<Option<NaiveDate>> {
    value.map(|value| parse_date(&value)).transpose()
}
