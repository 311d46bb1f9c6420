//! SQLite-backed [`FlowlineStore`] adapters for NHDPlus medium- and
//! high-resolution schemas.
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::Connection;
use streamnet_core::{ComId, Flowline, FlowlineStore, NhdPlusId};

/// Medium-resolution NHDPlus store: `nhdflowline_network` + `plusflow`, both
/// in the same SQLite file.
pub struct MediumResStore {
    conn: Mutex<Connection>,
    /// First malformed-row/I/O error this store has hit, if any. A row that
    /// fails to decode (e.g. a NULL/non-numeric `streamleve`/`streamorde`)
    /// must not be treated the same as a legitimate "not found" — it is
    /// recorded here and surfaced to the driver via `take_error` so the
    /// affected watershed can be aborted rather than silently truncated.
    error: Mutex<Option<String>>,
}

impl MediumResStore {
    pub fn open(flowline_path: &str, plusflow_path: &str) -> Result<Self> {
        let conn = Connection::open(flowline_path)
            .with_context(|| format!("opening flowline database at {flowline_path}"))?;
        conn.execute("ATTACH DATABASE ?1 AS plusflow_db", [plusflow_path])
            .with_context(|| format!("attaching plusflow database at {plusflow_path}"))?;
        Ok(Self {
            conn: Mutex::new(conn),
            error: Mutex::new(None),
        })
    }

    fn row_to_flowline(row: &rusqlite::Row<'_>) -> rusqlite::Result<Flowline<ComId>> {
        Ok(Flowline {
            id: row.get(0)?,
            reachcode: row.get(1)?,
            stream_level: row.get(2)?,
            strahler_order: row.get(3)?,
            divergence: row.get(4)?,
        })
    }

    /// Keep only the earliest error so the diagnostic names the first
    /// failure rather than whatever was last to fail.
    fn record_error(&self, context: &str, e: rusqlite::Error) {
        let mut slot = self.error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(format!("{context}: {e}"));
        }
    }
}

impl FlowlineStore for MediumResStore {
    type Id = ComId;

    fn get(&self, id: ComId) -> Option<Flowline<ComId>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "select comid, reachcode, streamleve, streamorde, divergence \
             from nhdflowline_network where comid = ?1",
            [id],
            Self::row_to_flowline,
        ) {
            Ok(f) => Some(f),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                self.record_error(&format!("fetching flowline {id}"), e);
                None
            }
        }
    }

    fn headwaters(&self, huc8: &str) -> Vec<ComId> {
        let conn = self.conn.lock().unwrap();
        let like = format!("{huc8}%");
        let rows = (|| -> rusqlite::Result<Vec<ComId>> {
            let mut stmt = conn.prepare(
                "select comid from nhdflowline_network \
                 where reachcode like ?1 and startflag = 1 order by comid desc",
            )?;
            stmt.query_map([like], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()
        })();
        match rows {
            Ok(v) => v,
            Err(e) => {
                self.record_error(&format!("listing headwaters for HUC8 {huc8}"), e);
                Vec::new()
            }
        }
    }

    fn upstream(&self, id: ComId) -> Vec<Flowline<ComId>> {
        let conn = self.conn.lock().unwrap();
        let rows = (|| -> rusqlite::Result<Vec<Flowline<ComId>>> {
            let mut stmt = conn.prepare(
                "select f.comid, f.reachcode, f.streamleve, f.streamorde, f.divergence \
                 from nhdflowline_network f \
                 join plusflow_db.plusflow p on p.fromcomid = f.comid \
                 where p.tocomid = ?1 order by p.fromcomid desc",
            )?;
            stmt.query_map([id], Self::row_to_flowline)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })();
        match rows {
            Ok(v) => v,
            Err(e) => {
                self.record_error(&format!("listing upstream flowlines of {id}"), e);
                Vec::new()
            }
        }
    }

    fn downstream(&self, id: ComId) -> Vec<Flowline<ComId>> {
        let conn = self.conn.lock().unwrap();
        let rows = (|| -> rusqlite::Result<Vec<Flowline<ComId>>> {
            let mut stmt = conn.prepare(
                "select f.comid, f.reachcode, f.streamleve, f.streamorde, f.divergence \
                 from nhdflowline_network f \
                 join plusflow_db.plusflow p on p.tocomid = f.comid \
                 where p.fromcomid = ?1 order by p.tocomid asc",
            )?;
            stmt.query_map([id], Self::row_to_flowline)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })();
        match rows {
            Ok(v) => v,
            Err(e) => {
                self.record_error(&format!("listing downstream flowlines of {id}"), e);
                Vec::new()
            }
        }
    }

    fn take_error(&self) -> Option<String> {
        self.error.lock().unwrap().take()
    }
}

/// High-resolution NHDPlus HR store: `nhdflowline` + `nhdplusflowlinevaa` +
/// `nhdplusflow`, all in the same SQLite file. IDs are floating point.
pub struct HighResStore {
    conn: Mutex<Connection>,
    error: Mutex<Option<String>>,
}

impl HighResStore {
    pub fn open(flowline_path: &str) -> Result<Self> {
        let conn = Connection::open(flowline_path)
            .with_context(|| format!("opening NHDPlus HR database at {flowline_path}"))?;
        Ok(Self {
            conn: Mutex::new(conn),
            error: Mutex::new(None),
        })
    }

    fn row_to_flowline(row: &rusqlite::Row<'_>) -> rusqlite::Result<Flowline<NhdPlusId>> {
        let id: f64 = row.get(0)?;
        Ok(Flowline {
            id: NhdPlusId::from_f64(id),
            reachcode: row.get(1)?,
            stream_level: row.get(2)?,
            strahler_order: row.get(3)?,
            divergence: row.get(4)?,
        })
    }

    fn record_error(&self, context: &str, e: rusqlite::Error) {
        let mut slot = self.error.lock().unwrap();
        if slot.is_none() {
            *slot = Some(format!("{context}: {e}"));
        }
    }
}

impl FlowlineStore for HighResStore {
    type Id = NhdPlusId;

    fn get(&self, id: NhdPlusId) -> Option<Flowline<NhdPlusId>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "select fl.nhdplusid, fl.reachcode, vaa.streamleve, vaa.streamorde, vaa.divergence \
             from nhdflowline fl, nhdplusflowlinevaa vaa \
             where fl.nhdplusid = ?1 and fl.nhdplusid = vaa.nhdplusid",
            [id.to_f64()],
            Self::row_to_flowline,
        ) {
            Ok(f) => Some(f),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                self.record_error(&format!("fetching flowline {id}"), e);
                None
            }
        }
    }

    fn headwaters(&self, huc8: &str) -> Vec<NhdPlusId> {
        let conn = self.conn.lock().unwrap();
        let like = format!("{huc8}%");
        let rows = (|| -> rusqlite::Result<Vec<NhdPlusId>> {
            let mut stmt = conn.prepare(
                "select nhdplusid from nhdplusflowlinevaa where reachcode like ?1 and startflag = 1",
            )?;
            stmt.query_map([like], |row| row.get::<_, f64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()
        })();
        match rows {
            Ok(v) => v.into_iter().map(NhdPlusId::from_f64).collect(),
            Err(e) => {
                self.record_error(&format!("listing headwaters for HUC8 {huc8}"), e);
                Vec::new()
            }
        }
    }

    fn upstream(&self, id: NhdPlusId) -> Vec<Flowline<NhdPlusId>> {
        let conn = self.conn.lock().unwrap();
        let rows = (|| -> rusqlite::Result<Vec<Flowline<NhdPlusId>>> {
            let mut stmt = conn.prepare(
                "select fl.nhdplusid, fl.reachcode, vaa.streamleve, vaa.streamorde, vaa.divergence \
                 from nhdflowline fl, nhdplusflowlinevaa vaa, nhdplusflow pf \
                 where pf.tonhdpid = ?1 and pf.fromnhdpid = fl.nhdplusid and fl.nhdplusid = vaa.nhdplusid",
            )?;
            stmt.query_map([id.to_f64()], Self::row_to_flowline)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })();
        match rows {
            Ok(v) => v,
            Err(e) => {
                self.record_error(&format!("listing upstream flowlines of {id}"), e);
                Vec::new()
            }
        }
    }

    fn downstream(&self, id: NhdPlusId) -> Vec<Flowline<NhdPlusId>> {
        let conn = self.conn.lock().unwrap();
        let rows = (|| -> rusqlite::Result<Vec<Flowline<NhdPlusId>>> {
            let mut stmt = conn.prepare(
                "select fl.nhdplusid, fl.reachcode, vaa.streamleve, vaa.streamorde, vaa.divergence \
                 from nhdflowline fl, nhdplusflowlinevaa vaa, nhdplusflow pf \
                 where pf.fromnhdpid = ?1 and pf.tonhdpid = fl.nhdplusid and fl.nhdplusid = vaa.nhdplusid",
            )?;
            stmt.query_map([id.to_f64()], Self::row_to_flowline)?
                .collect::<rusqlite::Result<Vec<_>>>()
        })();
        match rows {
            Ok(v) => v,
            Err(e) => {
                self.record_error(&format!("listing downstream flowlines of {id}"), e);
                Vec::new()
            }
        }
    }

    fn take_error(&self) -> Option<String> {
        self.error.lock().unwrap().take()
    }
}
